//! The gateway's POP3 listener
//!
//! Every accepted connection gets its own task and an independent
//! session. Sessions share only the account store and the upstream
//! client, and through it the process-wide nonce generator.

use crate::account::FileAccountStore;
use crate::config::GatewayConfig;
use crate::error::Result;
use crate::oauth::NonceGenerator;
use crate::pop3::{Session, SessionContext};
use crate::tls::load_acceptor;
use crate::upstream::UpstreamClient;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tokio_rustls::server::TlsStream;
use tracing::{debug, info, warn};

/// Serves POP3 sessions on accepted connections.
pub struct Gateway {
    context: Arc<SessionContext>,
    tls: Option<TlsAcceptor>,
}

impl Gateway {
    #[must_use]
    pub fn new(context: SessionContext) -> Self {
        Self {
            context: Arc::new(context),
            tls: None,
        }
    }

    /// Wrap every connection in TLS before greeting the client.
    #[must_use]
    pub fn with_tls(mut self, acceptor: TlsAcceptor) -> Self {
        self.tls = Some(acceptor);
        self
    }

    /// A gateway backed by the upstream API and a file account store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the TLS
    /// certificate or key cannot be loaded.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let oauth = config.oauth_client(Arc::new(NonceGenerator::new()))?;
        let gateway = Self::new(SessionContext {
            gateway_name: config.gateway_name.clone(),
            domain: config.domain.clone(),
            fetch_count: config.fetch_count,
            auth_failure_delay: config.auth_failure_delay,
            idle_timeout: config.idle_timeout,
            accounts: Arc::new(FileAccountStore::new(&config.account_dir)),
            messages: Arc::new(UpstreamClient::new(
                Arc::new(oauth),
                config.messages_url.as_str(),
            )),
        });
        Ok(match &config.tls {
            Some(paths) => gateway.with_tls(load_acceptor(&paths.cert, &paths.key)?),
            None => gateway,
        })
    }

    /// Accept connections until accepting fails.
    ///
    /// # Errors
    ///
    /// Returns the error from `accept`. Errors within a connection only
    /// end that connection.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!(tls = self.tls.is_some(), "Serving POP3 on {}", addr);
        }
        loop {
            let (stream, peer) = listener.accept().await?;
            tokio::spawn(handle_connection(
                stream,
                peer,
                self.tls.clone(),
                Arc::clone(&self.context),
            ));
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    tls: Option<TlsAcceptor>,
    context: Arc<SessionContext>,
) {
    debug!("Connection from {}", peer);
    let result = match tls {
        Some(acceptor) => match handshake(&acceptor, stream, context.idle_timeout).await {
            Ok(stream) => Session::new(stream, context).run().await,
            Err(e) => {
                warn!("TLS handshake with {} failed: {}", peer, e);
                return;
            }
        },
        None => Session::new(stream, context).run().await,
    };
    match result {
        Ok(()) => debug!("Connection from {} closed", peer),
        Err(e) => info!("Session with {} ended: {}", peer, e),
    }
}

/// Run the TLS handshake, giving up after `limit` like an idle session.
async fn handshake(
    acceptor: &TlsAcceptor,
    stream: TcpStream,
    limit: Option<Duration>,
) -> io::Result<TlsStream<TcpStream>> {
    let accept = acceptor.accept(stream);
    match limit {
        Some(limit) => tokio::time::timeout(limit, accept)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "TLS handshake took too long"))?,
        None => accept.await,
    }
}
