//! Unified message type for all export sources.
//!
//! This module provides [`Message`], the normalized representation every
//! importer produces, plus [`Direction`] and [`MediaAttachment`].
//!
//! # Overview
//!
//! A message consists of:
//! - **Required**: source tag, `from`, `to`, `timestamp_utc`
//! - **Defaulted**: `body` (empty), `direction` (`Unknown`), `attachments` (empty)
//! - **Optional**: `conversation` (thread label from the source)
//!
//! Messages are values: every transformation (direction classification,
//! contact merging) builds a new `Message` through the `with_*` methods.
//!
//! # Examples
//!
//! ```
//! use chatunify::{Contact, Direction, Message};
//! use chrono::{TimeZone, Utc};
//!
//! let ts = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
//! let msg = Message::new("sms-backup", Contact::new("Me"), Contact::from_address("+15551234567"), ts)
//!     .with_body("hi")
//!     .with_direction(Direction::Sent);
//!
//! assert_eq!(msg.body(), "hi");
//! assert!(msg.is_sent());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::contact::Contact;

/// Whether the local user sent or received a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Written by the local user.
    Sent,
    /// Written by someone else.
    Received,
    /// The source carries no signal and the local user could not be resolved.
    #[default]
    Unknown,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Sent => write!(f, "sent"),
            Direction::Received => write!(f, "received"),
            Direction::Unknown => write!(f, "unknown"),
        }
    }
}

/// Reference to a media item inside a source archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAttachment {
    /// Opaque reference into the source archive (relative path, URI, or
    /// `archive/part/name` locator).
    pub original_source_path: String,
    /// MIME type, `application/octet-stream` when the source doesn't say.
    pub mime_type: String,
}

impl MediaAttachment {
    /// Creates an attachment reference.
    pub fn new(original_source_path: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            original_source_path: original_source_path.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Creates an attachment whose MIME type is guessed from the file extension.
    pub fn from_path_guess(original_source_path: impl Into<String>) -> Self {
        let path = original_source_path.into();
        let mime = guess_mime(&path);
        Self::new(path, mime)
    }

    /// Last path segment of [`original_source_path`](Self::original_source_path).
    ///
    /// ```
    /// use chatunify::MediaAttachment;
    ///
    /// let a = MediaAttachment::new("messages/inbox/bob/photos/123.jpg", "image/jpeg");
    /// assert_eq!(a.file_name(), "123.jpg");
    /// ```
    pub fn file_name(&self) -> &str {
        let path = if self.original_source_path.contains("://") {
            self.original_source_path.split('?').next().unwrap_or_default()
        } else {
            self.original_source_path.as_str()
        };
        let path = path.trim_end_matches(['/', '\\']);
        path.rsplit(['/', '\\']).next().unwrap_or(path)
    }
}

/// Guesses a MIME type from a file name or URI extension.
pub fn guess_mime(path: &str) -> &'static str {
    let clean = path.split('?').next().unwrap_or(path);
    let ext = clean
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "3gp" => "video/3gpp",
        "mp3" => "audio/mpeg",
        "m4a" | "aac" => "audio/aac",
        "ogg" | "opus" => "audio/ogg",
        "wav" => "audio/wav",
        "amr" => "audio/amr",
        "pdf" => "application/pdf",
        "vcf" => "text/x-vcard",
        _ => "application/octet-stream",
    }
}

/// A normalized message from any supported source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    source_application: String,
    from: Contact,
    to: Contact,
    timestamp_utc: DateTime<Utc>,
    #[serde(default)]
    body: String,
    #[serde(default)]
    direction: Direction,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<MediaAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    conversation: Option<String>,
}

impl Message {
    /// Creates a message with an empty body, no attachments and
    /// [`Direction::Unknown`].
    pub fn new(
        source_application: impl Into<String>,
        from: Contact,
        to: Contact,
        timestamp_utc: DateTime<Utc>,
    ) -> Self {
        Self {
            source_application: source_application.into(),
            from,
            to,
            timestamp_utc,
            body: String::new(),
            direction: Direction::Unknown,
            attachments: Vec::new(),
            conversation: None,
        }
    }

    // =========================================================================
    // Builder methods
    // =========================================================================

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<MediaAttachment>) -> Self {
        self.attachments = attachments;
        self
    }

    #[must_use]
    pub fn with_conversation(mut self, conversation: impl Into<String>) -> Self {
        self.conversation = Some(conversation.into());
        self
    }

    /// Returns this message with a different sender; everything else is kept.
    #[must_use]
    pub fn with_from(mut self, from: Contact) -> Self {
        self.from = from;
        self
    }

    /// Returns this message with a different recipient; everything else is kept.
    #[must_use]
    pub fn with_to(mut self, to: Contact) -> Self {
        self.to = to;
        self
    }

    // =========================================================================
    // Accessor methods
    // =========================================================================

    /// Tag of the importer that produced this message (e.g. `"sms-backup"`).
    pub fn source_application(&self) -> &str {
        &self.source_application
    }

    pub fn from(&self) -> &Contact {
        &self.from
    }

    pub fn to(&self) -> &Contact {
        &self.to
    }

    pub fn timestamp_utc(&self) -> DateTime<Utc> {
        self.timestamp_utc
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn attachments(&self) -> &[MediaAttachment] {
        &self.attachments
    }

    /// Thread label supplied by the source, if any.
    pub fn conversation(&self) -> Option<&str> {
        self.conversation.as_deref()
    }

    // =========================================================================
    // Utility methods
    // =========================================================================

    pub fn is_sent(&self) -> bool {
        self.direction == Direction::Sent
    }

    /// Returns `true` if the message has neither text nor attachments.
    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty() && self.attachments.is_empty()
    }
}
