//! Unified error types for chatunify.
//!
//! This module provides a single [`UnifyError`] enum that covers every
//! source-level failure in the library. Record-level problems (one malformed
//! message inside an otherwise readable export) never surface here; importers
//! skip them and count them in [`ImportBatch::skipped`](crate::importer::ImportBatch).
//!
//! # Error Handling Philosophy
//!
//! - **Record-level** problems are skipped and logged
//! - **Source-level** problems are returned as [`UnifyError`] and turned into a
//!   warning by the registry, so other sources keep importing
//! - **Corpus-level** status is reported by [`CorpusStatus`](crate::registry::CorpusStatus)

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A specialized [`Result`] type for chatunify operations.
///
/// # Example
///
/// ```rust
/// use chatunify::error::Result;
/// use chatunify::Message;
///
/// fn my_function() -> Result<Vec<Message>> {
///     Ok(vec![])
/// }
/// ```
pub type Result<T> = std::result::Result<T, UnifyError>;

/// The error type for all chatunify operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UnifyError {
    /// An I/O error occurred.
    ///
    /// This typically happens when:
    /// - The export file doesn't exist or is unreadable
    /// - Permission denied
    /// - Disk is full (when writing output or the decision log)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Failed to parse a source export.
    ///
    /// Contains the format being parsed, the underlying parse error,
    /// and optionally the file path.
    #[error("Failed to parse {format} export{}: {source}", path.as_ref().map(|p| format!(" (file: {})", p.display())).unwrap_or_default())]
    Parse {
        /// The format being parsed (e.g., "SMS backup XML", "mbox")
        format: &'static str,
        /// The underlying parse error
        #[source]
        source: ParseErrorKind,
        /// The file path, if available
        path: Option<PathBuf>,
    },

    /// The export doesn't match the expected structure.
    ///
    /// This occurs when:
    /// - A groupware directory has no conversation files
    /// - A social export lacks its `messages` array
    /// - A legacy export has no `conversation_state`
    #[error("Invalid {format} format: {message}")]
    InvalidFormat {
        /// The format that was expected
        format: &'static str,
        /// Description of what's wrong
        message: String,
    },

    /// JSON parsing/serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writing error.
    #[cfg(feature = "csv-output")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Directory traversal failed during auto-detection.
    #[error("Traversal error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Configuration file could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// The merge decision log is unreadable or inconsistent.
    #[error("Decision log error ({}): {message}", path.display())]
    DecisionLog {
        /// Location of the decision log
        path: PathBuf,
        /// Description of what's wrong
        message: String,
    },

    /// A merge candidate index that doesn't exist was selected.
    #[error("No merge candidate #{index} (only {available} pending)")]
    UnknownCandidate {
        /// Index that was requested
        index: usize,
        /// Number of pending candidates
        available: usize,
    },
}

/// Kinds of parse errors that can occur.
#[derive(Debug, Error)]
pub enum ParseErrorKind {
    /// JSON parsing error
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// XML parsing error
    #[cfg(feature = "sms")]
    #[error("{0}")]
    Xml(#[from] quick_xml::Error),
    /// Generic parsing error
    #[error("{0}")]
    Other(String),
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl UnifyError {
    /// Creates a parse error for SMS backup XML.
    #[cfg(feature = "sms")]
    pub fn sms_parse(source: quick_xml::Error, path: Option<PathBuf>) -> Self {
        UnifyError::Parse {
            format: "SMS backup XML",
            source: ParseErrorKind::Xml(source),
            path,
        }
    }

    /// Creates a parse error for social-network message JSON.
    pub fn social_parse(source: serde_json::Error, path: Option<PathBuf>) -> Self {
        UnifyError::Parse {
            format: "social message JSON",
            source: ParseErrorKind::Json(source),
            path,
        }
    }

    /// Creates a parse error for groupware chat JSON.
    pub fn groupchat_parse(source: serde_json::Error, path: Option<PathBuf>) -> Self {
        UnifyError::Parse {
            format: "group chat JSON",
            source: ParseErrorKind::Json(source),
            path,
        }
    }

    /// Creates a parse error for legacy conversation JSON.
    pub fn legacy_parse(source: serde_json::Error, path: Option<PathBuf>) -> Self {
        UnifyError::Parse {
            format: "legacy conversation JSON",
            source: ParseErrorKind::Json(source),
            path,
        }
    }

    /// Creates a parse error for an mbox archive.
    pub fn mail_parse(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        UnifyError::Parse {
            format: "mbox",
            source: ParseErrorKind::Other(message.into()),
            path,
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(format: &'static str, message: impl Into<String>) -> Self {
        UnifyError::InvalidFormat {
            format,
            message: message.into(),
        }
    }

    /// Creates a decision log error.
    pub fn decision_log(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        UnifyError::DecisionLog {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this is an IO error.
    pub fn is_io(&self) -> bool {
        matches!(self, UnifyError::Io(_))
    }

    /// Returns `true` if this is a parse error.
    pub fn is_parse(&self) -> bool {
        matches!(self, UnifyError::Parse { .. })
    }

    /// Returns `true` if this is an invalid format error.
    pub fn is_invalid_format(&self) -> bool {
        matches!(self, UnifyError::InvalidFormat { .. })
    }
}
