//! The importer abstraction shared by every source normalizer.
//!
//! Each supported export format has one [`Importer`] implementation. The
//! [`ImporterRegistry`](crate::registry::ImporterRegistry) asks every
//! importer whether it recognizes a path ([`Importer::can_import`]) and
//! then runs the matching ones ([`Importer::import`]).
//!
//! State that used to live in globals (who the local user is, which
//! addresses belong to them) travels in an explicit [`ImportContext`].
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "sms")]
//! # fn main() {
//! use chatunify::importer::{Source, create_importer};
//!
//! let importer = create_importer(Source::Sms).unwrap();
//! assert_eq!(importer.name(), "SMS Backup");
//! assert_eq!(importer.source(), Source::Sms);
//! # }
//! # #[cfg(not(feature = "sms"))]
//! # fn main() {}
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::contact::{Contact, normalize_email};
use crate::error::Result;
use crate::message::Message;

/// Supported export sources.
///
/// ```rust
/// use chatunify::importer::Source;
/// use std::str::FromStr;
///
/// assert_eq!(Source::from_str("mbox").unwrap(), Source::Mail);
/// assert_eq!(Source::from_str("Hangouts").unwrap(), Source::Legacy);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Source {
    /// Phone SMS/MMS backup XML
    Sms,

    /// Social-network message JSON (`message_1.json`)
    #[serde(alias = "fb")]
    Social,

    /// Groupware chat JSON (`Groups/*/messages.json`)
    #[serde(alias = "gchat")]
    GroupChat,

    /// Legacy conversation JSON (`conversation_state`)
    #[serde(alias = "hangouts")]
    Legacy,

    /// mbox mail archive
    #[serde(alias = "mbox")]
    Mail,
}

impl Source {
    /// Tag written to [`Message::source_application`].
    pub fn tag(&self) -> &'static str {
        match self {
            Source::Sms => "sms-backup",
            Source::Social => "social",
            Source::GroupChat => "groupchat",
            Source::Legacy => "legacy-chat",
            Source::Mail => "mbox",
        }
    }

    /// Returns all source names including aliases.
    pub fn all_names() -> &'static [&'static str] {
        &[
            "sms", "social", "fb", "groupchat", "gchat", "legacy", "hangouts", "mail", "mbox",
        ]
    }

    /// Returns all sources in detection order.
    pub fn all() -> &'static [Source] {
        &[
            Source::Sms,
            Source::Social,
            Source::GroupChat,
            Source::Legacy,
            Source::Mail,
        ]
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Sms => write!(f, "SMS"),
            Source::Social => write!(f, "Social"),
            Source::GroupChat => write!(f, "Group Chat"),
            Source::Legacy => write!(f, "Legacy Chat"),
            Source::Mail => write!(f, "Mail"),
        }
    }
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sms" => Ok(Source::Sms),
            "social" | "fb" => Ok(Source::Social),
            "groupchat" | "gchat" => Ok(Source::GroupChat),
            "legacy" | "hangouts" => Ok(Source::Legacy),
            "mail" | "mbox" => Ok(Source::Mail),
            _ => Err(format!(
                "Unknown source: '{}'. Expected one of: {}",
                s,
                Source::all_names().join(", ")
            )),
        }
    }
}

/// Explicit state threaded through every import call.
///
/// # Example
///
/// ```rust
/// use chatunify::importer::ImportContext;
///
/// let ctx = ImportContext::new().with_local_email("Me@Example.com");
/// assert!(ctx.is_local_email("me@example.com"));
/// assert_eq!(ctx.self_contact().name(), "Me");
/// ```
#[derive(Debug, Clone)]
pub struct ImportContext {
    config: Config,
    local_emails: BTreeSet<String>,
    self_contact: Contact,
}

impl Default for ImportContext {
    fn default() -> Self {
        Self {
            config: Config::default(),
            local_emails: BTreeSet::new(),
            self_contact: Contact::new("Me"),
        }
    }
}

impl ImportContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Declares an address owned by the local user.
    ///
    /// Configured addresses are an explicit signal and take precedence over
    /// the identity heuristic.
    #[must_use]
    pub fn with_local_email(mut self, email: &str) -> Self {
        let normalized = normalize_email(email);
        if !normalized.is_empty() {
            self.local_emails.insert(normalized);
        }
        self
    }

    /// Sets the contact used for the local side of sources that never name it
    /// (SMS backups, social exports).
    #[must_use]
    pub fn with_self_contact(mut self, contact: Contact) -> Self {
        self.self_contact = contact;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn local_emails(&self) -> &BTreeSet<String> {
        &self.local_emails
    }

    /// Returns `true` if `email` was declared with [`with_local_email`](Self::with_local_email).
    pub fn is_local_email(&self, email: &str) -> bool {
        self.local_emails.contains(&normalize_email(email))
    }

    pub fn self_contact(&self) -> &Contact {
        &self.self_contact
    }
}

/// Result of importing one source path.
#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    /// Normalized messages in source order.
    pub messages: Vec<Message>,
    /// Records that were malformed and skipped.
    pub skipped: usize,
    /// Local-user identity the importer inferred or was told, if any.
    pub local_identity: Option<String>,
}

impl ImportBatch {
    pub fn new(messages: Vec<Message>, skipped: usize) -> Self {
        Self {
            messages,
            skipped,
            local_identity: None,
        }
    }

    #[must_use]
    pub fn with_local_identity(mut self, identity: Option<String>) -> Self {
        self.local_identity = identity;
        self
    }

    /// Appends another batch, summing skip counts. The first known identity wins.
    pub fn extend(&mut self, other: ImportBatch) {
        self.messages.extend(other.messages);
        self.skipped += other.skipped;
        if self.local_identity.is_none() {
            self.local_identity = other.local_identity;
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// One source normalizer.
///
/// Implementations must:
/// - answer [`can_import`](Importer::can_import) cheaply (names and a short
///   content sniff at most) and case-insensitively on path names
/// - skip malformed records individually inside [`import`](Importer::import)
///   and only return `Err` when the whole source is unusable
pub trait Importer: Send + Sync {
    /// Human-readable importer name.
    fn name(&self) -> &'static str;

    /// Source this importer handles.
    fn source(&self) -> Source;

    /// Returns `true` if `path` (file or directory) is an export this
    /// importer understands.
    fn can_import(&self, path: &Path) -> bool;

    /// Imports every message under `path`.
    ///
    /// # Errors
    ///
    /// Returns [`UnifyError`](crate::UnifyError) if the source as a whole
    /// cannot be read or parsed.
    fn import(&self, path: &Path, ctx: &ImportContext) -> Result<ImportBatch>;
}

/// Creates the importer for `source`, or `None` if its feature is disabled.
pub fn create_importer(source: Source) -> Option<Box<dyn Importer>> {
    match source {
        #[cfg(feature = "sms")]
        Source::Sms => Some(Box::new(crate::importers::SmsImporter::new())),
        #[cfg(feature = "social")]
        Source::Social => Some(Box::new(crate::importers::SocialImporter::new())),
        #[cfg(feature = "groupchat")]
        Source::GroupChat => Some(Box::new(crate::importers::GroupChatImporter::new())),
        #[cfg(feature = "legacy")]
        Source::Legacy => Some(Box::new(crate::importers::LegacyImporter::new())),
        #[cfg(feature = "mail")]
        Source::Mail => Some(Box::new(crate::importers::MailImporter::new())),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

/// Creates importers for every source whose feature is enabled.
pub fn all_importers() -> Vec<Box<dyn Importer>> {
    Source::all()
        .iter()
        .filter_map(|s| create_importer(*s))
        .collect()
}
