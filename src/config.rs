//! Gateway configuration

use crate::error::{Error, Result};
use crate::oauth::{Credentials, Endpoints, NonceGenerator, OAuthClient};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// PEM files for serving POP3 over TLS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the POP3 listener binds to.
    pub listen: String,
    /// Name announced in the POP3 greeting.
    pub gateway_name: String,
    /// Domain used in the addresses of rendered messages.
    pub domain: String,
    /// The consumer key and secret identifying this gateway upstream.
    pub consumer: Credentials,
    pub scope: Option<String>,
    pub endpoints: Endpoints,
    pub messages_url: String,
    pub fetch_count: u32,
    pub account_dir: PathBuf,
    pub auth_failure_delay: Duration,
    pub upstream_timeout: Duration,
    /// `None` when idle connections are never closed.
    pub idle_timeout: Option<Duration>,
    /// Serve POP3 over TLS when set.
    pub tls: Option<TlsPaths>,
}

impl GatewayConfig {
    /// Load the configuration from environment variables
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `OAUTH_CONSUMER_KEY`
    /// - `OAUTH_CONSUMER_SECRET`
    ///
    /// Optional (with defaults):
    /// - `POP_LISTEN` (default: `0.0.0.0:1100`)
    /// - `GATEWAY_NAME` (default: `dm-gateway`)
    /// - `GATEWAY_DOMAIN` (default: `localhost`)
    /// - `OAUTH_SCOPE` (default: none)
    /// - `OAUTH_REQUEST_TOKEN_URL`, `OAUTH_AUTHORIZE_URL`,
    ///   `OAUTH_ACCESS_TOKEN_URL` (default: Twitter's endpoints)
    /// - `MESSAGES_URL` (default: Twitter's direct messages endpoint)
    /// - `FETCH_COUNT` (default: `50`)
    /// - `ACCOUNT_DIR` (default: `db`)
    /// - `AUTH_FAILURE_DELAY_MS` (default: `1000`)
    /// - `UPSTREAM_TIMEOUT_SECS` (default: `30`)
    /// - `IDLE_TIMEOUT_SECS` (default: `600`, `0` disables)
    /// - `TLS_CERT_PATH` and `TLS_KEY_PATH` (default: plain TCP)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or a
    /// value is invalid.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// Same as [`GatewayConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required =
            |key: &str| lookup(key).ok_or_else(|| Error::Config(format!("{key} not set")));

        let tls = match (lookup("TLS_CERT_PATH"), lookup("TLS_KEY_PATH")) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => {
                return Err(Error::Config(
                    "TLS_CERT_PATH and TLS_KEY_PATH must be set together".into(),
                ));
            }
        };
        let idle_secs: u64 = number(&lookup, "IDLE_TIMEOUT_SECS", 600)?;

        Ok(Self {
            listen: var("POP_LISTEN", "0.0.0.0:1100"),
            gateway_name: var("GATEWAY_NAME", "dm-gateway"),
            domain: var("GATEWAY_DOMAIN", "localhost"),
            consumer: Credentials::new(
                required("OAUTH_CONSUMER_KEY")?,
                required("OAUTH_CONSUMER_SECRET")?,
            ),
            scope: lookup("OAUTH_SCOPE").filter(|s| !s.is_empty()),
            endpoints: Endpoints {
                temporary_credentials: var(
                    "OAUTH_REQUEST_TOKEN_URL",
                    "https://api.twitter.com/oauth/request_token",
                ),
                authorization: var(
                    "OAUTH_AUTHORIZE_URL",
                    "https://api.twitter.com/oauth/authorize",
                ),
                token_request: var(
                    "OAUTH_ACCESS_TOKEN_URL",
                    "https://api.twitter.com/oauth/access_token",
                ),
            },
            messages_url: var(
                "MESSAGES_URL",
                "https://api.twitter.com/1/direct_messages.json",
            ),
            fetch_count: number(&lookup, "FETCH_COUNT", 50)?,
            account_dir: var("ACCOUNT_DIR", "db").into(),
            auth_failure_delay: Duration::from_millis(number(
                &lookup,
                "AUTH_FAILURE_DELAY_MS",
                1000,
            )?),
            upstream_timeout: Duration::from_secs(number(&lookup, "UPSTREAM_TIMEOUT_SECS", 30)?),
            idle_timeout: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
            tls,
        })
    }

    /// An OAuth client for this gateway's consumer credentials, sharing
    /// `nonces` with every other signer in the process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be built.
    pub fn oauth_client(&self, nonces: Arc<NonceGenerator>) -> Result<OAuthClient> {
        let http = reqwest::Client::builder()
            .timeout(self.upstream_timeout)
            .build()?;
        let client = OAuthClient::new(self.consumer.clone(), self.endpoints.clone(), nonces, http);
        Ok(match &self.scope {
            Some(scope) => client.with_scope(scope.as_str()),
            None => client,
        })
    }
}

fn number<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid {key}: {e}")))
    })
}
