//! POP3 session state machine
//!
//! A session starts in the authorization state and moves to the
//! transaction state once `USER`/`PASS` succeed; there is no way back.
//! Commands are handled strictly one at a time. A command sent in the
//! wrong state gets an error reply and ends the session, while unknown
//! commands are ignored without a reply.
//!
//! The mailbox is fetched from upstream on the first command that needs
//! it and kept for the rest of the session. A failed fetch is reported to
//! the client and not cached, so the next command tries again.

use super::command::{Command, message_number};
use super::io::LineStream;
use super::mailbox::Mailbox;
use crate::account::{Account, AccountStore};
use crate::error::{Error, Result};
use crate::upstream::MessageSource;
use std::fmt::Write;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

/// Everything a session needs from the gateway, shared by all sessions.
pub struct SessionContext {
    /// Name announced in the greeting.
    pub gateway_name: String,
    /// Domain for the addresses in rendered messages.
    pub domain: String,
    /// How many messages to ask upstream for.
    pub fetch_count: u32,
    /// Pause before answering a failed `PASS`.
    pub auth_failure_delay: Duration,
    /// Longest wait for the next command line; `None` waits forever.
    pub idle_timeout: Option<Duration>,
    pub accounts: Arc<dyn AccountStore>,
    pub messages: Arc<dyn MessageSource>,
}

enum State {
    Authorization {
        user: Option<String>,
    },
    Transaction {
        account: Account,
        mailbox: Option<Mailbox>,
    },
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// One client connection.
pub struct Session<S> {
    stream: LineStream<S>,
    ctx: Arc<SessionContext>,
    state: State,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    pub fn new(stream: S, ctx: Arc<SessionContext>) -> Self {
        Self {
            stream: LineStream::new(stream),
            ctx,
            state: State::Authorization { user: None },
        }
    }

    /// Greet the client and serve commands until `QUIT` or end of stream.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the session early: a transport
    /// failure or idle timeout ([`Error::Io`]), a malformed line
    /// ([`Error::MalformedLine`]) or a command in the wrong state
    /// ([`Error::WrongState`]).
    pub async fn run(mut self) -> Result<()> {
        let greeting = format!(
            "+OK POP3 {} here, ready to proxy your DMs, yo",
            self.ctx.gateway_name
        );
        self.stream.write_line(&greeting).await?;

        while let Some(line) = self.next_line().await? {
            let command = Command::parse(&line);
            debug!("< {}", command);
            if self.handle(command).await? == Flow::Quit {
                break;
            }
        }
        Ok(())
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        match self.ctx.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, self.stream.read_line())
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "client idle too long"))?,
            None => self.stream.read_line().await,
        }
    }

    async fn handle(&mut self, command: Command) -> Result<Flow> {
        match &command {
            Command::Quit => {
                self.stream.write_line("+OK").await?;
                return Ok(Flow::Quit);
            }
            Command::Unknown(keyword) => {
                warn!("Ignoring unknown command {:?}", keyword);
                return Ok(Flow::Continue);
            }
            _ => {}
        }

        let allowed = match self.state {
            State::Authorization { .. } => command.is_authorization(),
            State::Transaction { .. } => command.is_transaction(),
        };
        if !allowed {
            let name = command.name().to_string();
            self.stream
                .write_line(&format!("-ERR {name} command not valid in this state"))
                .await?;
            return Err(Error::WrongState(name));
        }

        match command {
            Command::User(user) => self.user(user).await?,
            Command::Pass(password) => self.pass(&password).await?,
            Command::Auth => self.stream.write_line("-ERR AUTH not supported").await?,
            Command::Capa => self.stream.write_line("-ERR CAPA not supported").await?,
            Command::Stat => self.stat().await?,
            Command::List(arg) => self.list(arg.as_deref()).await?,
            Command::Uidl(arg) => self.uidl(arg.as_deref()).await?,
            Command::Retr(args) | Command::Top(args) => self.retr(&args).await?,
            Command::Dele(args) => self.dele(&args).await?,
            Command::Quit | Command::Unknown(_) => {}
        }
        Ok(Flow::Continue)
    }

    async fn user(&mut self, user: String) -> Result<()> {
        self.state = State::Authorization { user: Some(user) };
        self.stream.write_line("+OK").await
    }

    async fn pass(&mut self, password: &str) -> Result<()> {
        let State::Authorization { user } = &self.state else {
            return Err(Error::WrongState("PASS".into()));
        };
        let user = user.clone();

        let result = match &user {
            Some(user) => self.ctx.accounts.get_account(user, password).await,
            None => Err(Error::AuthFailed),
        };
        match result {
            Ok(account) => {
                info!("Authenticated {}", account.username);
                self.state = State::Transaction {
                    account,
                    mailbox: None,
                };
                self.stream.write_line("+OK").await
            }
            Err(e) => {
                info!(user = user.as_deref().unwrap_or(""), "Authentication failed: {}", e);
                tokio::time::sleep(self.ctx.auth_failure_delay).await;
                self.stream.write_line("-ERR authentication failed").await
            }
        }
    }

    async fn stat(&mut self) -> Result<()> {
        let reply = match load_mailbox(&mut self.state, &self.ctx).await {
            Ok(mailbox) => format!("+OK {} {}", mailbox.len(), mailbox.total_octets()),
            Err(e) => fetch_error(&e),
        };
        self.stream.write_line(&reply).await
    }

    async fn list(&mut self, arg: Option<&str>) -> Result<()> {
        if arg.is_some() {
            return self
                .stream
                .write_line("-ERR LIST with an argument is not supported")
                .await;
        }
        match load_mailbox(&mut self.state, &self.ctx).await {
            Ok(mailbox) => {
                let mut body = String::new();
                for (n, entry) in mailbox.iter() {
                    let _ = write!(body, "{n} {}\r\n", entry.octets());
                }
                let status = format!("+OK {} messages", mailbox.len());
                self.stream.write_multiline(&status, &body).await
            }
            Err(e) => self.stream.write_line(&fetch_error(&e)).await,
        }
    }

    async fn uidl(&mut self, arg: Option<&str>) -> Result<()> {
        if arg.is_some() {
            return self
                .stream
                .write_line("-ERR UIDL with an argument is not supported")
                .await;
        }
        match load_mailbox(&mut self.state, &self.ctx).await {
            Ok(mailbox) => {
                let mut body = String::new();
                for (n, entry) in mailbox.iter() {
                    let _ = write!(body, "{n} {}\r\n", entry.unique_id());
                }
                let status = format!("+OK {} messages", mailbox.len());
                self.stream.write_multiline(&status, &body).await
            }
            Err(e) => self.stream.write_line(&fetch_error(&e)).await,
        }
    }

    /// `RETR n`, and `TOP n lines` which sends the whole message too.
    async fn retr(&mut self, args: &str) -> Result<()> {
        let Some(n) = message_number(args) else {
            return self.stream.write_line("-ERR bad number").await;
        };
        match load_mailbox(&mut self.state, &self.ctx).await {
            Ok(mailbox) => match mailbox.get(n) {
                Some(entry) => {
                    let status = format!("+OK {} octets", entry.octets());
                    self.stream.write_multiline(&status, entry.rendered()).await
                }
                None => self.stream.write_line("-ERR no such message").await,
            },
            Err(e) => self.stream.write_line(&fetch_error(&e)).await,
        }
    }

    /// Acknowledged only; nothing is removed here or upstream.
    async fn dele(&mut self, args: &str) -> Result<()> {
        let Some(n) = message_number(args) else {
            return self.stream.write_line("-ERR bad number").await;
        };
        debug!("DELE {} acknowledged", n);
        self.stream.write_line("+OK").await
    }
}

/// The session's mailbox, fetched on first use.
async fn load_mailbox<'a>(state: &'a mut State, ctx: &SessionContext) -> Result<&'a Mailbox> {
    let State::Transaction { account, mailbox } = state else {
        return Err(Error::WrongState("mailbox".into()));
    };
    match mailbox {
        Some(mailbox) => Ok(mailbox),
        None => {
            let messages = ctx
                .messages
                .fetch_messages(&account.credentials(), ctx.fetch_count)
                .await
                .inspect_err(|e| warn!("Fetching messages for {} failed: {}", account.username, e))?;
            info!("Fetched {} messages for {}", messages.len(), account.username);
            Ok(mailbox.insert(Mailbox::from_messages(&messages, &ctx.domain)))
        }
    }
}

/// A single `-ERR` line for a failed fetch.
/// Longest error text put on a `-ERR` line, in characters.
const MAX_ERROR_TEXT: usize = 200;

fn fetch_error(e: &Error) -> String {
    let text: String = e
        .to_string()
        .chars()
        .take(MAX_ERROR_TEXT)
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    format!("-ERR {text}")
}
