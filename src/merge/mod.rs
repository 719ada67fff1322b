//! Contact merge engine.
//!
//! Sources name the same person differently: a phone number in SMS, a
//! display name in a social export, an email in mail. This module finds
//! likely duplicates ([`find_candidates`]), records what the operator decided
//! about them ([`DecisionLog`]), and rewrites messages to use the chosen
//! canonical contact ([`apply_merges`]).
//!
//! # Example
//!
//! ```rust
//! use chatunify::config::MergeConfig;
//! use chatunify::merge::{DecisionLog, MergeDecision, apply_merges, collect_contacts, find_candidates};
//! use chatunify::{Contact, Message};
//! use chrono::{TimeZone, Utc};
//!
//! # fn main() -> chatunify::Result<()> {
//! let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
//! let me = Contact::new("Me");
//! let messages = vec![
//!     Message::new("sms-backup", Contact::from_address("+15551234567"), me.clone(), ts),
//!     Message::new("social", Contact::new("Bob").with_phone("555-123-4567"), me, ts),
//! ];
//!
//! let mut log = DecisionLog::new();
//! let groups = find_candidates(&collect_contacts(&messages), &MergeConfig::default(), &log);
//! assert_eq!(groups.len(), 1);
//!
//! let target = groups[0].suggested();
//! log.record(MergeDecision::merge(groups[0].signatures(), &target, "same phone"))?;
//!
//! let merged = apply_merges(messages, &log.plan());
//! assert!(merged.iter().all(|m| m.from() == &target));
//! # Ok(())
//! # }
//! ```

mod apply;
mod candidates;
mod decisions;

pub use apply::{MergePlan, apply_merges};
pub use candidates::{
    CandidateGroup, MatchReason, candidate, collect_contacts, find_candidates, name_similarity,
};
pub use decisions::{DecisionLog, MergeDecision};
