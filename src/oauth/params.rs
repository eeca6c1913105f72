//! Multi-valued request parameters
//!
//! OAuth signs the full set of request parameters, and a name may carry
//! several values. [`Params`] keeps names in sorted order so the form
//! encoding of a set is deterministic.

use super::encode::encode;
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Parameter names mapped to one or more values.
///
/// Names are case-sensitive. The order values were added in is kept per
/// name but carries no meaning for signing, which sorts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    inner: BTreeMap<String, Vec<String>>,
}

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from `(name, value)` pairs, keeping repeated names.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.add(key, value);
        }
        params
    }

    /// The first value for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value for `key`.
    #[must_use]
    pub fn get_all(&self, key: &str) -> &[String] {
        self.inner.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Append a value for `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.entry(key.into()).or_default().push(value.into());
    }

    /// Replace all values for `key` with a single one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(key.into(), vec![value.into()]);
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.inner.remove(key)
    }

    /// Names in ascending byte order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    /// Every `(name, value)` pair, names ascending.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |v| (key.as_str(), v.as_str())))
    }

    /// Number of values across all names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `application/x-www-form-urlencoded` form of the set.
    #[must_use]
    pub fn form_encode(&self) -> String {
        self.iter()
            .map(|(key, value)| format!("{}={}", encode(key, false), encode(value, false)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parse an `application/x-www-form-urlencoded` body.
    ///
    /// `+` decodes to a space. A pair without `=` is a name with an empty
    /// value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadFormEncoding`] on a truncated or non-hex
    /// escape, or when the decoded bytes are not UTF-8.
    pub fn parse_form(input: &str) -> Result<Self> {
        let mut params = Self::new();
        for pair in input.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params.add(percent_decode(key, true)?, percent_decode(value, true)?);
        }
        Ok(params)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

const fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Undo percent-encoding, optionally treating `+` as a space.
pub(crate) fn percent_decode(input: &str, plus_as_space: bool) -> Result<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hi = bytes.get(i + 1).copied().and_then(hex_value);
                let lo = bytes.get(i + 2).copied().and_then(hex_value);
                let (Some(hi), Some(lo)) = (hi, lo) else {
                    return Err(Error::BadFormEncoding);
                };
                out.push((hi << 4) | lo);
                i += 3;
            }
            b'+' if plus_as_space => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| Error::BadFormEncoding)
}
