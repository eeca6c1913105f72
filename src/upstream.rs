//! Fetching direct messages from the upstream API

use crate::error::{Error, Result};
use crate::message::Message;
use crate::oauth::{Credentials, OAuthClient, Params};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Where a session gets its messages from.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Fetch up to `count` of the account's most recent messages.
    async fn fetch_messages(&self, credentials: &Credentials, count: u32) -> Result<Vec<Message>>;
}

/// Fetches messages with a signed GET to the messages endpoint.
pub struct UpstreamClient {
    oauth: Arc<OAuthClient>,
    messages_url: String,
}

impl UpstreamClient {
    #[must_use]
    pub fn new(oauth: Arc<OAuthClient>, messages_url: impl Into<String>) -> Self {
        Self {
            oauth,
            messages_url: messages_url.into(),
        }
    }
}

#[async_trait]
impl MessageSource for UpstreamClient {
    async fn fetch_messages(&self, credentials: &Credentials, count: u32) -> Result<Vec<Message>> {
        let params = Params::from_pairs([("count", count.to_string())]);
        let body = self
            .oauth
            .signed_get(credentials, &self.messages_url, params)
            .await?;
        let messages = parse_messages(&body)?;
        debug!(count = messages.len(), "fetched messages");
        Ok(messages)
    }
}

/// Parse a JSON array of message objects.
///
/// Array elements that are not objects are skipped.
///
/// # Errors
///
/// Returns [`Error::Json`] if `body` is not JSON and
/// [`Error::UnexpectedResponse`] if it is not an array.
pub fn parse_messages(body: &str) -> Result<Vec<Message>> {
    let items = match serde_json::from_str::<Value>(body)? {
        Value::Array(items) => items,
        other => {
            return Err(Error::UnexpectedResponse(format!(
                "expected a JSON array of messages, got {}",
                json_kind(&other)
            )));
        }
    };

    let mut messages = Vec::with_capacity(items.len());
    for item in items {
        if !item.is_object() {
            debug!(kind = json_kind(&item), "skipping non-object message entry");
            continue;
        }
        match Message::deserialize(item) {
            Ok(message) => messages.push(message),
            Err(e) => warn!("Skipping undecodable message: {}", e),
        }
    }
    Ok(messages)
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_array_of_messages() {
        let body = r#"[
            {"id": 2, "text": "second", "created_at": "b", "sender": {"screen_name": "x", "name": "X"}},
            {"id": 1, "text": "first", "created_at": "a", "sender": {"screen_name": "y", "name": "Y"}}
        ]"#;
        let messages = parse_messages(body).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, 2);
        assert_eq!(messages[1].sender.screen_name, "y");
    }

    #[test]
    fn skips_non_object_elements() {
        let messages = parse_messages(r#"[1, "two", null, {"id": 3}, [4]]"#).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, 3);
    }

    #[test]
    fn empty_array_is_empty_mailbox() {
        assert!(parse_messages("[]").unwrap().is_empty());
    }

    #[test]
    fn rejects_non_array_top_level() {
        let err = parse_messages(r#"{"errors": [{"message": "Rate limit exceeded"}]}"#).unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse(_)));
        assert!(err.to_string().contains("an object"));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(parse_messages("[{"), Err(Error::Json(_))));
    }
}
