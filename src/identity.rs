//! Local-user identity resolution.
//!
//! Group chat exports record each message's creator but never say which
//! creator is the account owner. The owner shows up in every conversation
//! exported for their account, while any other participant only shows up in
//! some, so [`IdentityResolver`] counts, for each creator identity, the number
//! of *distinct* conversations it appears in and picks the maximum.
//!
//! Raw message counts are deliberately not used: one very chatty contact in
//! a single conversation must not outrank the owner.
//!
//! A tie for first place, or a corpus with no identities at all, leaves the
//! owner unresolved. Callers then keep [`Direction::Unknown`] for every
//! message of that source.
//!
//! # Example
//!
//! ```
//! use chatunify::identity::{IdentityResolver, Resolution};
//!
//! let mut resolver = IdentityResolver::new();
//! resolver.observe("family", "a@x.com");
//! resolver.observe("work", "A@x.com");
//! resolver.observe("work", "b@x.com");
//!
//! assert_eq!(resolver.resolve(), Resolution::Resolved("a@x.com".into()));
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::message::Direction;

/// Outcome of [`IdentityResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A single identity appears in strictly more conversations than any other.
    Resolved(String),
    /// Several identities share the highest conversation count.
    Tie(Vec<String>),
    /// No identity was observed.
    NoSignal,
}

impl Resolution {
    /// The resolved identity, if any.
    pub fn identity(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(id) => Some(id),
            Resolution::Tie(_) | Resolution::NoSignal => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// Counts distinct conversations per creator identity.
///
/// Identities are compared case-insensitively (they are usually emails).
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    conversations: BTreeMap<String, BTreeSet<String>>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `identity` created at least one message in `conversation`.
    ///
    /// Blank identities are ignored. Observing the same pair twice has no
    /// further effect.
    pub fn observe(&mut self, conversation: &str, identity: &str) {
        let key = identity.trim().to_lowercase();
        if key.is_empty() {
            return;
        }
        self.conversations
            .entry(key)
            .or_default()
            .insert(conversation.to_string());
    }

    /// Number of distinct conversations `identity` was observed in.
    pub fn conversation_count(&self, identity: &str) -> usize {
        self.conversations
            .get(&identity.trim().to_lowercase())
            .map_or(0, BTreeSet::len)
    }

    /// Number of distinct identities observed.
    pub fn identity_count(&self) -> usize {
        self.conversations.len()
    }

    /// Picks the identity with the highest distinct-conversation count.
    pub fn resolve(&self) -> Resolution {
        let Some(best) = self.conversations.values().map(BTreeSet::len).max() else {
            return Resolution::NoSignal;
        };

        let mut leaders: Vec<String> = self
            .conversations
            .iter()
            .filter(|(_, convs)| convs.len() == best)
            .map(|(id, _)| id.clone())
            .collect();

        if leaders.len() == 1 {
            Resolution::Resolved(leaders.remove(0))
        } else {
            Resolution::Tie(leaders)
        }
    }
}

/// Classifies a message creator against the resolved local identity.
///
/// - creator matches `local` (case-insensitive): [`Direction::Sent`]
/// - creator is known but differs: [`Direction::Received`]
/// - creator unknown, or no local identity: [`Direction::Unknown`]
pub fn classify(creator: Option<&str>, local: Option<&str>) -> Direction {
    let creator = creator.map(str::trim).filter(|c| !c.is_empty());
    match (creator, local) {
        (Some(c), Some(l)) if c.eq_ignore_ascii_case(l.trim()) => Direction::Sent,
        (Some(_), Some(_)) => Direction::Received,
        _ => Direction::Unknown,
    }
}
