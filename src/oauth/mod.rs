//! OAuth 1.0a (RFC 5849) client support, HMAC-SHA1 only

mod client;
mod encode;
mod nonce;
mod params;

pub use client::{Credentials, Endpoints, OAuthClient, authorization_header, signature};
pub use encode::{base_string, encode};
pub use nonce::NonceGenerator;
pub use params::Params;
