//! POP3 server side: command parsing, line I/O, the mailbox snapshot and
//! the per-connection session.

mod command;
mod io;
mod mailbox;
mod session;

pub use command::{Command, message_number};
pub use io::{LineStream, MAX_LINE_LENGTH};
pub use mailbox::{Entry, Mailbox};
pub use session::{Session, SessionContext};
