//! Per-session mailbox snapshot

use crate::message::Message;

/// One message in a [`Mailbox`], rendered once when the snapshot is taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    id: i64,
    rendered: String,
}

impl Entry {
    /// Size reported by `STAT`/`LIST`: the byte length of the rendering.
    #[must_use]
    pub const fn octets(&self) -> usize {
        self.rendered.len()
    }

    /// Stable id for `UIDL`, derived from the upstream message id.
    #[must_use]
    pub fn unique_id(&self) -> String {
        format!("dm{}", self.id)
    }

    #[must_use]
    pub fn rendered(&self) -> &str {
        &self.rendered
    }
}

/// The ordered messages a session serves, addressed by 1-based ordinal.
///
/// Never changes once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mailbox {
    entries: Vec<Entry>,
}

impl Mailbox {
    /// Snapshot `messages` in upstream order, rendering addresses under
    /// `domain`.
    #[must_use]
    pub fn from_messages(messages: &[Message], domain: &str) -> Self {
        let entries = messages
            .iter()
            .map(|m| Entry {
                id: m.id,
                rendered: m.to_rfc822(domain),
            })
            .collect();
        Self { entries }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn total_octets(&self) -> usize {
        self.entries.iter().map(Entry::octets).sum()
    }

    /// The message at 1-based `ordinal`.
    #[must_use]
    pub fn get(&self, ordinal: usize) -> Option<&Entry> {
        self.entries.get(ordinal.checked_sub(1)?)
    }

    /// Entries with their 1-based ordinals.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Entry)> {
        self.entries.iter().enumerate().map(|(i, e)| (i + 1, e))
    }
}
