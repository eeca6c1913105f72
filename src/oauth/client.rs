//! OAuth 1.0a client: request signing and the three-legged flow

use super::encode::{base_string, encode};
use super::nonce::NonceGenerator;
use super::params::Params;
use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use ring::hmac;
use std::fmt::Write;
use std::sync::Arc;
use tracing::debug;

/// A token and its shared secret.
///
/// Used for the client's own credentials (consumer key and secret), for
/// temporary credentials during authorization and for the token
/// credentials of a linked account.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Endpoints of the three-legged authorization flow.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Temporary credential request URI (a.k.a. request token URL).
    pub temporary_credentials: String,
    /// Resource owner authorization URI.
    pub authorization: String,
    /// Token request URI (a.k.a. access token URL).
    pub token_request: String,
}

/// Compute the HMAC-SHA1 signature of a request (RFC 5849 section 3.4).
///
/// The key is the encoded client secret and the encoded token secret
/// joined by `&`; the token secret is empty when `token` is `None`.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if `url` cannot be parsed.
pub fn signature(
    client: &Credentials,
    token: Option<&Credentials>,
    method: &str,
    url: &str,
    params: &Params,
) -> Result<String> {
    let mut key = encode(&client.secret, false);
    key.push('&');
    if let Some(token) = token {
        key.push_str(&encode(&token.secret, false));
    }

    let base = base_string(method, url, params)?;
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, key.as_bytes());
    let tag = hmac::sign(&key, base.as_bytes());
    Ok(STANDARD.encode(tag.as_ref()))
}

/// Move the `oauth_*` parameters out of `params` into an `Authorization`
/// header value.
///
/// Names are emitted in sorted order and every value is quoted. Every
/// value is percent-encoded once as RFC 5849 section 3.5.1 requires, not
/// just the signature. For well-formed keys, tokens and nonces only the
/// base64 signature changes. Whatever remains in `params` belongs in the
/// query string or body.
pub fn authorization_header(params: &mut Params) -> String {
    let keys: Vec<String> = params
        .keys()
        .filter(|key| key.starts_with("oauth_"))
        .map(str::to_owned)
        .collect();

    let mut header = String::from("OAuth");
    for (n, key) in keys.iter().enumerate() {
        let value = params
            .remove(key)
            .and_then(|values| values.into_iter().next())
            .unwrap_or_default();
        if n > 0 {
            header.push(',');
        }
        let _ = write!(header, " {key}=\"{}\"", encode(&value, false));
    }
    header
}

/// An OAuth client identified by its consumer credentials.
pub struct OAuthClient {
    credentials: Credentials,
    endpoints: Endpoints,
    scope: Option<String>,
    nonces: Arc<NonceGenerator>,
    http: reqwest::Client,
}

impl OAuthClient {
    #[must_use]
    pub const fn new(
        credentials: Credentials,
        endpoints: Endpoints,
        nonces: Arc<NonceGenerator>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            credentials,
            endpoints,
            scope: None,
            nonces,
            http,
        }
    }

    /// Send `scope` with every signed request.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Add the OAuth protocol parameters and signature to `params`.
    ///
    /// The signature is computed last, over every other parameter,
    /// including the ones added here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Random`] if no nonce can be produced, or
    /// [`Error::InvalidUrl`] if `url` cannot be parsed.
    pub fn sign_params(
        &self,
        token: Option<&Credentials>,
        method: &str,
        url: &str,
        params: &mut Params,
    ) -> Result<()> {
        params.remove("oauth_signature");
        params.set("oauth_consumer_key", self.credentials.token.as_str());
        params.set("oauth_signature_method", "HMAC-SHA1");
        params.set("oauth_timestamp", chrono::Utc::now().timestamp().to_string());
        params.set("oauth_nonce", self.nonces.next_nonce()?);
        params.set("oauth_version", "1.0");
        if let Some(scope) = &self.scope {
            params.set("scope", scope.as_str());
        }
        if let Some(token) = token {
            params.set("oauth_token", token.token.as_str());
        }
        let sig = signature(&self.credentials, token, method, url, params)?;
        params.set("oauth_signature", sig);
        Ok(())
    }

    /// The URL to send the resource owner to for approving `temporary`.
    #[must_use]
    pub fn authorization_url(&self, temporary: &Credentials) -> String {
        format!(
            "{}?oauth_token={}",
            self.endpoints.authorization,
            encode(&temporary.token, false)
        )
    }

    /// Obtain temporary credentials (a.k.a. a request token).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upstream`] on a non-200 response and
    /// [`Error::OAuth`] if the response lacks a token or secret.
    pub async fn request_temporary_credentials(&self, callback: Option<&str>) -> Result<Credentials> {
        let mut params = Params::new();
        if let Some(callback) = callback.filter(|c| !c.is_empty()) {
            params.set("oauth_callback", callback);
        }
        let (credentials, _) = self
            .request(None, &self.endpoints.temporary_credentials, params)
            .await?;
        Ok(credentials)
    }

    /// Exchange approved temporary credentials for token credentials.
    ///
    /// Also returns every parameter of the response; services commonly
    /// include the account's screen name there.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upstream`] on a non-200 response and
    /// [`Error::OAuth`] if the response lacks a token or secret.
    pub async fn request_token(
        &self,
        temporary: &Credentials,
        verifier: &str,
    ) -> Result<(Credentials, Params)> {
        let mut params = Params::new();
        if !verifier.is_empty() {
            params.set("oauth_verifier", verifier);
        }
        self.request(Some(temporary), &self.endpoints.token_request, params)
            .await
    }

    /// Issue a signed GET and return the body of a 200 response.
    ///
    /// The OAuth parameters travel in the `Authorization` header, all
    /// others in the query string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the request fails and
    /// [`Error::Upstream`] on a non-200 response.
    pub async fn signed_get(&self, token: &Credentials, url: &str, mut params: Params) -> Result<String> {
        self.sign_params(Some(token), "GET", url, &mut params)?;
        let header = authorization_header(&mut params);
        let request_url = if params.is_empty() {
            url.to_string()
        } else {
            format!("{url}?{}", params.form_encode())
        };

        debug!(url = %request_url, "signed GET");
        let response = self
            .http
            .get(&request_url)
            .header(AUTHORIZATION, header)
            .send()
            .await?;
        read_body(response).await
    }

    async fn request(
        &self,
        token: Option<&Credentials>,
        url: &str,
        mut params: Params,
    ) -> Result<(Credentials, Params)> {
        self.sign_params(token, "POST", url, &mut params)?;

        debug!(url, "signed POST");
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(params.form_encode())
            .send()
            .await?;
        let body = read_body(response).await?;

        let values = Params::parse_form(&body)?;
        let credentials = Credentials::new(
            values.get("oauth_token").unwrap_or_default(),
            values.get("oauth_token_secret").unwrap_or_default(),
        );
        if credentials.token.is_empty() {
            return Err(Error::OAuth("no oauth_token in server response".into()));
        }
        if credentials.secret.is_empty() {
            return Err(Error::OAuth("no oauth_token_secret in server response".into()));
        }
        Ok((credentials, values))
    }
}

async fn read_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    if status != StatusCode::OK {
        return Err(Error::Upstream {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}
