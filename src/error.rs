//! Error types for dm-gateway

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected upstream response: {0}")]
    UnexpectedResponse(String),

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("malformed form-encoded data")]
    BadFormEncoding,

    #[error("invalid URL {0}")]
    InvalidUrl(String),

    #[error("authentication failed")]
    AuthFailed,

    #[error("invalid username {0:?}")]
    InvalidUsername(String),

    #[error("{0} command in wrong state")]
    WrongState(String),

    #[error("malformed command line")]
    MalformedLine,

    #[error("secure random source unavailable")]
    Random,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TLS error: {0}")]
    Tls(String),
}

pub type Result<T> = std::result::Result<T, Error>;
