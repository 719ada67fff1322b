//! Configuration types for importers, detection and contact merging.
//!
//! This module provides plain configuration structs for library usage,
//! without any CLI framework dependencies. Every struct has sensible
//! defaults and `with_*` builder methods, and [`Config`] aggregates them so
//! a whole setup can be loaded from one TOML file.
//!
//! # Example
//!
//! ```rust
//! use chatunify::config::{Config, MergeConfig, ScanConfig};
//!
//! let config = Config::default()
//!     .with_scan(ScanConfig::new().with_max_depth(4).with_parallel(true))
//!     .with_merge(MergeConfig::new().with_name_similarity(0.95));
//!
//! assert_eq!(config.scan.max_depth, 4);
//! ```
//!
//! # TOML
//!
//! ```rust
//! use chatunify::config::Config;
//!
//! let config = Config::from_toml_str(r#"
//!     [scan]
//!     parallel = true
//!
//!     [mail]
//!     sent_labels = ["Sent", "Gesendet"]
//! "#).unwrap();
//!
//! assert!(config.scan.parallel);
//! assert_eq!(config.mail.sent_labels.len(), 2);
//! assert_eq!(config.scan.max_depth, 8);
//! ```

use std::fs;
use std::path::Path;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::timestamp::offset_from_minutes;

/// Settings for directory traversal during auto-detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum directory depth below the root (default: 8)
    pub max_depth: usize,

    /// Follow symbolic links while scanning (default: false)
    pub follow_links: bool,

    /// Run importers on parallel threads (default: false)
    pub parallel: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            follow_links: false,
            parallel: false,
        }
    }
}

impl ScanConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum traversal depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Enables or disables following symlinks.
    #[must_use]
    pub fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Enables or disables parallel import.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Configuration for SMS/MMS backup XML.
///
/// # Example
///
/// ```rust
/// use chatunify::config::SmsConfig;
///
/// let config = SmsConfig::new().with_unknown_contact_name("Unknown");
/// assert!(config.is_unknown_name("unknown"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsConfig {
    /// `contact_name` values meaning "no name", compared case-insensitively
    /// (default: `(Unknown)`, `null`, empty)
    pub unknown_contact_names: Vec<String>,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            unknown_contact_names: vec!["(Unknown)".into(), "null".into(), String::new()],
        }
    }
}

impl SmsConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a placeholder contact name.
    #[must_use]
    pub fn with_unknown_contact_name(mut self, name: impl Into<String>) -> Self {
        self.unknown_contact_names.push(name.into());
        self
    }

    /// Returns `true` if `name` is a placeholder rather than a real name.
    pub fn is_unknown_name(&self, name: &str) -> bool {
        let name = name.trim();
        self.unknown_contact_names
            .iter()
            .any(|u| u.trim().eq_ignore_ascii_case(name))
    }
}

/// Configuration for social-network message JSON.
///
/// Meta exports store UTF-8 text as Latin-1 code points; the importer
/// repairs it when `fix_encoding` is on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialConfig {
    /// Repair Meta's broken UTF-8 encoding (Mojibake) (default: true)
    pub fix_encoding: bool,

    /// Sender names that denote the local user (default: `Me`)
    pub self_aliases: Vec<String>,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            fix_encoding: true,
            self_aliases: vec!["Me".into()],
        }
    }
}

impl SocialConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the encoding fix.
    #[must_use]
    pub fn with_fix_encoding(mut self, fix: bool) -> Self {
        self.fix_encoding = fix;
        self
    }

    /// Adds a sender name that denotes the local user.
    #[must_use]
    pub fn with_self_alias(mut self, alias: impl Into<String>) -> Self {
        self.self_aliases.push(alias.into());
        self
    }

    /// Returns `true` if `sender` is one of the self aliases (case-insensitive).
    pub fn is_self(&self, sender: &str) -> bool {
        let sender = sender.trim();
        self.self_aliases
            .iter()
            .any(|a| a.trim().eq_ignore_ascii_case(sender))
    }
}

/// Configuration for groupware chat exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupChatConfig {
    /// Per-conversation message file name (default: `messages.json`)
    pub conversation_file: String,

    /// Per-conversation member list file name (default: `group_info.json`)
    pub group_info_file: String,
}

impl Default for GroupChatConfig {
    fn default() -> Self {
        Self {
            conversation_file: "messages.json".into(),
            group_info_file: "group_info.json".into(),
        }
    }
}

impl GroupChatConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_conversation_file(mut self, name: impl Into<String>) -> Self {
        self.conversation_file = name.into();
        self
    }

    #[must_use]
    pub fn with_group_info_file(mut self, name: impl Into<String>) -> Self {
        self.group_info_file = name.into();
        self
    }
}

/// Configuration for mbox mail archives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Use the stripped HTML part even when a text/plain part exists (default: false)
    pub prefer_html: bool,

    /// `X-Gmail-Labels` entries that mark a message as sent (default: `Sent`)
    pub sent_labels: Vec<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            prefer_html: false,
            sent_labels: vec!["Sent".into()],
        }
    }
}

impl MailConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_prefer_html(mut self, prefer: bool) -> Self {
        self.prefer_html = prefer;
        self
    }

    #[must_use]
    pub fn with_sent_label(mut self, label: impl Into<String>) -> Self {
        self.sent_labels.push(label.into());
        self
    }

    /// Returns `true` if a comma-separated label header names a sent label.
    pub fn is_sent_label_header(&self, header: &str) -> bool {
        header.split(',').map(str::trim).any(|label| {
            self.sent_labels
                .iter()
                .any(|s| s.trim().eq_ignore_ascii_case(label))
        })
    }
}

/// Settings for duplicate contact detection.
///
/// # Example
///
/// ```rust
/// use chatunify::config::MergeConfig;
///
/// let config = MergeConfig::new()
///     .with_name_similarity(0.9)
///     .with_match_emails(false);
/// assert!(!config.match_emails);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Minimum Jaro-Winkler similarity for two names to match (default: 0.92)
    pub name_similarity: f64,

    /// Names shorter than this (in characters) never match by similarity (default: 3)
    pub min_name_len: usize,

    /// Treat a shared email address as a match (default: true)
    pub match_emails: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            name_similarity: 0.92,
            min_name_len: 3,
            match_emails: true,
        }
    }
}

impl MergeConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name similarity threshold, clamped to `0.0..=1.0`.
    #[must_use]
    pub fn with_name_similarity(mut self, threshold: f64) -> Self {
        self.name_similarity = threshold.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub fn with_min_name_len(mut self, len: usize) -> Self {
        self.min_name_len = len;
        self
    }

    #[must_use]
    pub fn with_match_emails(mut self, enabled: bool) -> Self {
        self.match_emails = enabled;
        self
    }
}

/// Settings for date strings that carry no zone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampConfig {
    /// Minutes east of UTC assumed for naive date strings (default: 0)
    pub naive_utc_offset_minutes: i32,
}

impl TimestampConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_naive_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.naive_utc_offset_minutes = minutes;
        self
    }

    /// The configured offset as a chrono [`FixedOffset`].
    pub fn naive_offset(&self) -> FixedOffset {
        offset_from_minutes(self.naive_utc_offset_minutes)
    }
}

/// Complete configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub sms: SmsConfig,
    pub social: SocialConfig,
    pub groupchat: GroupChatConfig,
    pub mail: MailConfig,
    pub merge: MergeConfig,
    pub timestamp: TimestampConfig,
}

impl Config {
    /// Parses a configuration from TOML text. Missing sections use defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reads and parses a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    #[must_use]
    pub fn with_scan(mut self, scan: ScanConfig) -> Self {
        self.scan = scan;
        self
    }

    #[must_use]
    pub fn with_sms(mut self, sms: SmsConfig) -> Self {
        self.sms = sms;
        self
    }

    #[must_use]
    pub fn with_social(mut self, social: SocialConfig) -> Self {
        self.social = social;
        self
    }

    #[must_use]
    pub fn with_groupchat(mut self, groupchat: GroupChatConfig) -> Self {
        self.groupchat = groupchat;
        self
    }

    #[must_use]
    pub fn with_mail(mut self, mail: MailConfig) -> Self {
        self.mail = mail;
        self
    }

    #[must_use]
    pub fn with_merge(mut self, merge: MergeConfig) -> Self {
        self.merge = merge;
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: TimestampConfig) -> Self {
        self.timestamp = timestamp;
        self
    }
}
