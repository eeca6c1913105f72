//! Direct message records and their RFC 822 rendering
//!
//! Records are decoded leniently: a field that is missing or has the
//! wrong JSON type takes its zero value (`0` or the empty string) rather
//! than failing the whole message.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt::Write;

/// A direct message as returned by the upstream API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Message {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: String,
    /// Creation time exactly as the API formats it.
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(default, deserialize_with = "lenient_sender")]
    pub sender: Sender,
}

/// The account that sent a [`Message`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Sender {
    #[serde(default, deserialize_with = "lenient_string")]
    pub screen_name: String,
    /// Display name.
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
}

impl Message {
    /// The message text on one line: newlines become ` / `, carriage
    /// returns are dropped.
    #[must_use]
    pub fn subject(&self) -> String {
        self.text.replace('\n', " / ").replace('\r', "")
    }

    /// Render the message as a mail with addresses under `domain`.
    ///
    /// The headers are `From`, `Subject`, `Date` and `Message-Id`; the
    /// body is the raw text. The byte length of the result is the size
    /// the POP3 session reports for the message.
    #[must_use]
    pub fn to_rfc822(&self, domain: &str) -> String {
        let mut out = String::with_capacity(128 + 2 * self.text.len());
        let _ = write!(
            out,
            "From: {}@{domain} ({})\r\n\
             Subject: {}\r\n\
             Date: {}\r\n\
             Message-Id: <{}@{domain}>\r\n\
             \r\n\
             {}",
            self.sender.screen_name,
            self.sender.name,
            self.subject(),
            self.created_at,
            self.id,
            self.text,
        );
        out
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

#[allow(clippy::cast_possible_truncation)]
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .unwrap_or_default())
}

fn lenient_sender<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Sender, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(Sender::deserialize(value).unwrap_or_default())
}
