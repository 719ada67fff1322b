//! # Chatunify
//!
//! A Rust library for normalizing personal messaging exports into one
//! message and contact model.
//!
//! ## Overview
//!
//! Chatunify reads the archives people download from their phones and
//! online accounts:
//! - **SMS backups** - SMS/MMS XML written by phone backup apps
//! - **Social exports** - `message_N.json` files from social-network data downloads
//! - **Group chat** - groupware chat directories (`Groups/*/messages.json`)
//! - **Legacy chat** - `conversation_state` JSON from retired chat services
//! - **Mail** - mbox archives
//!
//! Every source becomes a list of [`Message`] values with UTC timestamps,
//! a [`Direction`] relative to the local user, and [`Contact`] values that
//! can later be merged when several sources name the same person.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatunify::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let ctx = ImportContext::new().with_local_email("me@example.com");
//!     let outcome = ImporterRegistry::new().import_root("exports/".as_ref(), &ctx)?;
//!
//!     let log = DecisionLog::load("merge_decisions.json")?;
//!     let messages = apply_merges(outcome.messages, &log.plan());
//!
//!     write_json(&messages, "unified.json")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Finding duplicate contacts
//!
//! ```rust,no_run
//! use chatunify::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let outcome = ImporterRegistry::new().import_root("exports/".as_ref(), &ImportContext::new())?;
//! let mut log = DecisionLog::load("merge_decisions.json")?;
//!
//! let groups = find_candidates(&collect_contacts(&outcome.messages), &MergeConfig::default(), &log);
//! for group in &groups {
//!     println!("[{}] {}", group.index, group.suggested());
//! }
//! if let Some(first) = groups.first() {
//!     log.record(MergeDecision::merge(first.signatures(), &first.suggested(), "same person"))?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - [`message`], [`contact`] - the unified data model
//! - [`importer`] - the [`Importer`](importer::Importer) trait,
//!   [`Source`](importer::Source), [`ImportContext`](importer::ImportContext)
//! - [`importers`] - one importer per export format
//! - [`registry`] - directory scanning and corpus import
//! - [`parsing`] - raw export schemas and per-record mapping
//! - [`identity`] - local-user identity resolution
//! - [`timestamp`] - epoch and date-string normalization
//! - [`merge`] - candidate detection, the decision log, and merge application
//! - [`output`] - JSON, JSONL and CSV writers
//! - [`config`] - configuration types, loadable from TOML
//! - [`error`] - unified error types ([`UnifyError`], [`Result`])
//! - [`prelude`] - convenient re-exports

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod contact;
pub mod error;
pub mod identity;
pub mod importer;
pub mod importers;
pub mod merge;
pub mod message;
pub mod output;
pub mod parsing;
pub mod registry;
pub mod timestamp;

// Re-export the main types at the crate root for convenience
pub use contact::Contact;
pub use error::{Result, UnifyError};
pub use message::{Direction, MediaAttachment, Message};

/// Convenient re-exports for common usage.
///
/// Import everything you need with a single line:
///
/// ```rust
/// use chatunify::prelude::*;
/// ```
pub mod prelude {
    // Data model
    pub use crate::{Contact, Direction, MediaAttachment, Message};

    // Error types
    pub use crate::error::{Result, UnifyError};

    // Importing
    pub use crate::importer::{ImportBatch, ImportContext, Importer, Source, create_importer};
    pub use crate::registry::{CorpusStatus, ImportOutcome, ImporterRegistry};

    // Configuration
    pub use crate::config::{
        Config, GroupChatConfig, MailConfig, MergeConfig, ScanConfig, SmsConfig, SocialConfig,
        TimestampConfig,
    };

    // Identity and timestamps
    pub use crate::identity::{IdentityResolver, Resolution};
    pub use crate::timestamp::EpochUnit;

    // Merging
    pub use crate::merge::{
        CandidateGroup, DecisionLog, MergeDecision, MergePlan, apply_merges, collect_contacts,
        find_candidates,
    };

    // Output
    pub use crate::output::{OutputFormat, to_json, to_jsonl, write_json, write_jsonl, write_to_format};
    #[cfg(feature = "csv-output")]
    pub use crate::output::{to_csv, write_csv};
}
