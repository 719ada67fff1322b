//! Social-network message export records.
//!
//! Meta's "Download Your Data" archive writes one `message_N.json` per
//! conversation slice, newest message first.

use serde::Deserialize;
use serde_json::Value;

use crate::config::SocialConfig;
use crate::contact::Contact;
use crate::message::{Direction, MediaAttachment, Message};
use crate::timestamp::{EpochUnit, to_utc};

/// Raw message structure for deserialization.
#[derive(Debug, Deserialize)]
pub struct SocialRawMessage {
    pub sender_name: String,
    pub timestamp_ms: i64,
    pub content: Option<String>,
    pub share: Option<SocialShare>,
    #[serde(default)]
    pub photos: Option<Vec<SocialMedia>>,
    #[serde(default)]
    pub videos: Option<Vec<SocialMedia>>,
    #[serde(default)]
    pub audio_files: Option<Vec<SocialMedia>>,
}

/// Shared link attached to a message.
#[derive(Debug, Deserialize)]
pub struct SocialShare {
    pub share_text: Option<String>,
    pub link: Option<String>,
}

/// Photo, video or audio reference.
#[derive(Debug, Deserialize)]
pub struct SocialMedia {
    pub uri: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SocialParticipant {
    pub name: String,
}

/// Export wrapper. Messages stay as raw values so one bad record can be
/// skipped without losing the file.
#[derive(Debug, Deserialize)]
pub struct SocialExport {
    #[serde(default)]
    pub participants: Vec<SocialParticipant>,
    pub title: Option<String>,
    pub messages: Vec<Value>,
}

/// Fix Meta's broken encoding (Mojibake).
///
/// Meta exports UTF-8 text encoded as if it were ISO-8859-1: each UTF-8
/// byte is stored as a separate Unicode code point, so "Привет" becomes
/// "ÐŸÑ€Ð¸Ð²ÐµÑ‚". Text with any code point above U+00FF cannot be
/// mojibake and is returned unchanged.
///
/// ```
/// use chatunify::parsing::social::fix_mojibake_encoding;
///
/// assert_eq!(fix_mojibake_encoding("Hello"), "Hello");
/// assert_eq!(fix_mojibake_encoding("caf\u{00c3}\u{00a9}"), "café");
/// assert_eq!(fix_mojibake_encoding("Привет"), "Привет");
/// ```
pub fn fix_mojibake_encoding(s: &str) -> String {
    if s.chars().any(|c| c as u32 > 0xFF) {
        return s.to_string();
    }
    let bytes: Vec<u8> = s.chars().map(|c| c as u8).collect();
    String::from_utf8(bytes).unwrap_or_else(|_| s.to_string())
}

/// Per-file inputs for mapping records.
#[derive(Debug, Clone)]
pub struct SocialMapping<'a> {
    pub config: &'a SocialConfig,
    pub self_contact: &'a Contact,
    /// Recipient of messages the local user sent in this conversation.
    pub peer: Contact,
    pub title: Option<String>,
    pub source_tag: &'a str,
}

impl<'a> SocialMapping<'a> {
    /// Builds the mapping for one export, deriving the peer from the
    /// participant list: the single non-self participant, or the title for
    /// group threads.
    pub fn for_export(
        export: &SocialExport,
        config: &'a SocialConfig,
        self_contact: &'a Contact,
        source_tag: &'a str,
    ) -> Self {
        let fix = |s: &str| {
            if config.fix_encoding {
                fix_mojibake_encoding(s)
            } else {
                s.to_string()
            }
        };
        let title = export.title.as_deref().map(fix);
        let others: Vec<String> = export
            .participants
            .iter()
            .map(|p| fix(&p.name))
            .filter(|n| !is_self(n, config, self_contact))
            .collect();

        let peer = if let [only] = others.as_slice() {
            Contact::new(only.as_str())
        } else if let Some(t) = title.as_deref().filter(|t| !t.trim().is_empty()) {
            Contact::new(t)
        } else if !others.is_empty() {
            Contact::new(others.join(", "))
        } else {
            Contact::new("Unknown")
        };

        Self {
            config,
            self_contact,
            peer,
            title,
            source_tag,
        }
    }
}

fn is_self(sender: &str, config: &SocialConfig, self_contact: &Contact) -> bool {
    config.is_self(sender) || sender.trim().eq_ignore_ascii_case(self_contact.name())
}

fn media_uris(msg: &SocialRawMessage) -> impl Iterator<Item = &str> {
    [&msg.photos, &msg.videos, &msg.audio_files]
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(|m| m.uri.as_deref())
        .filter(|u| !u.trim().is_empty())
}

/// Parses a raw social message into a `Message`.
///
/// Returns `None` if the message has neither text nor media.
pub fn parse_social_message(msg: &SocialRawMessage, m: &SocialMapping<'_>) -> Option<Message> {
    let fix = |s: &str| {
        if m.config.fix_encoding {
            fix_mojibake_encoding(s)
        } else {
            s.to_string()
        }
    };

    // Shared posts without a caption carry their text in share_text
    let mut body = msg
        .content
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .or_else(|| msg.share.as_ref().and_then(|s| s.share_text.as_deref()))
        .map(fix)
        .unwrap_or_default();

    if let Some(link) = msg.share.as_ref().and_then(|s| s.link.as_deref()) {
        if !link.is_empty() && !body.contains(link) {
            if !body.is_empty() {
                body.push('\n');
            }
            body.push_str(link);
        }
    }

    let attachments: Vec<MediaAttachment> =
        media_uris(msg).map(MediaAttachment::from_path_guess).collect();

    let timestamp = to_utc(msg.timestamp_ms, EpochUnit::Millis)?;
    let sender = fix(&msg.sender_name);

    let (from, to, direction) = if is_self(&sender, m.config, m.self_contact) {
        (m.self_contact.clone(), m.peer.clone(), Direction::Sent)
    } else {
        (Contact::new(sender), m.self_contact.clone(), Direction::Received)
    };

    let mut message = Message::new(m.source_tag, from, to, timestamp)
        .with_body(body)
        .with_direction(direction)
        .with_attachments(attachments);
    if let Some(title) = &m.title {
        message = message.with_conversation(title.as_str());
    }

    (!message.is_empty()).then_some(message)
}
