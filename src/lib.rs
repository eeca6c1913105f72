//! POP3 gateway for social network direct messages
//!
//! Lets an ordinary mail client read an account's direct messages as a
//! POP3 mailbox. Each account is linked once through the OAuth 1.0a
//! three-legged flow; afterwards every POP3 session fetches the messages
//! with an HMAC-SHA1 signed request and serves them as RFC 822 mail.
//!
//! The [`oauth`] module signs requests, [`upstream`] fetches and decodes
//! messages, [`pop3`] runs sessions and [`Gateway`] accepts connections,
//! optionally over TLS.

mod account;
mod config;
mod error;
mod message;
pub mod oauth;
pub mod pop3;
mod server;
mod tls;
mod upstream;

pub use account::{Account, AccountStore, FileAccountStore, is_valid_username};
pub use config::{GatewayConfig, TlsPaths};
pub use error::{Error, Result};
pub use message::{Message, Sender};
pub use server::Gateway;
pub use tls::{acceptor_from, load_acceptor};
pub use upstream::{MessageSource, UpstreamClient, parse_messages};
