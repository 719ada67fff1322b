//! Legacy conversation export records (`Hangouts.json`).
//!
//! ```json
//! {"conversation_state": [{
//!     "conversation_id": {"id": "Ugx..."},
//!     "conversation_state": {
//!         "conversation": {
//!             "name": "Trip",
//!             "self_conversation_state": {"self_read_state": {"participant_id": {"gaia_id": "1"}}},
//!             "participant_data": [{"id": {"gaia_id": "1"}, "fallback_name": "Me"}]
//!         },
//!         "event": [{
//!             "sender_id": {"gaia_id": "1"},
//!             "timestamp": "1700000000000000",
//!             "chat_message": {"message_content": {"segment": [{"type": "TEXT", "text": "hi"}]}}
//!         }]
//!     }
//! }]}
//! ```
//!
//! Older exports put `conversation` and `event` directly on the entry
//! instead of under a nested `conversation_state`; both layouts are read.
//! Event timestamps are microseconds.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
pub struct LegacyExport {
    #[serde(default)]
    pub conversation_state: Vec<LegacyEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LegacyEntry {
    #[serde(default)]
    pub conversation_id: Option<LegacyConversationId>,
    #[serde(default)]
    pub conversation_state: Option<LegacyState>,
    #[serde(flatten)]
    pub inline: LegacyState,
}

impl LegacyEntry {
    /// The populated layout: nested state when present, inline otherwise.
    pub fn state(&self) -> &LegacyState {
        self.conversation_state
            .as_ref()
            .filter(|s| s.conversation.is_some() || !s.event.is_empty())
            .unwrap_or(&self.inline)
    }

    /// Stable conversation key: the export id, else the conversation's own id.
    pub fn key(&self, index: usize) -> String {
        self.conversation_id
            .as_ref()
            .and_then(|c| c.id.clone())
            .or_else(|| {
                self.state()
                    .conversation
                    .as_ref()
                    .and_then(|c| c.id.as_ref())
                    .and_then(|c| c.id.clone())
            })
            .unwrap_or_else(|| format!("conversation-{index}"))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LegacyConversationId {
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LegacyState {
    #[serde(default)]
    pub conversation: Option<LegacyConversation>,
    /// Raw events; decoded one at a time so a bad event is skipped alone.
    #[serde(default)]
    pub event: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LegacyConversation {
    #[serde(default)]
    pub id: Option<LegacyConversationId>,
    pub name: Option<String>,
    #[serde(default)]
    pub participant_data: Vec<LegacyParticipant>,
    #[serde(default)]
    pub self_conversation_state: Option<LegacySelfState>,
}

impl LegacyConversation {
    /// Gaia id the export declares as the account owner, if any.
    pub fn self_gaia_id(&self) -> Option<&str> {
        self.self_conversation_state
            .as_ref()?
            .self_read_state
            .as_ref()?
            .participant_id
            .as_ref()?
            .gaia()
    }

    pub fn participant(&self, gaia_id: &str) -> Option<&LegacyParticipant> {
        self.participant_data
            .iter()
            .find(|p| p.id.as_ref().and_then(LegacyParticipantId::gaia) == Some(gaia_id))
    }

    /// Display name for `gaia_id`: the participant's fallback name, else the id.
    pub fn display_name(&self, gaia_id: &str) -> String {
        self.participant(gaia_id)
            .and_then(|p| p.fallback_name.as_deref())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(gaia_id)
            .to_string()
    }

    /// Gaia ids of every participant except `exclude`.
    pub fn other_ids<'a>(&'a self, exclude: Option<&'a str>) -> impl Iterator<Item = &'a str> {
        self.participant_data
            .iter()
            .filter_map(|p| p.id.as_ref().and_then(LegacyParticipantId::gaia))
            .filter(move |id| Some(*id) != exclude)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LegacySelfState {
    pub self_read_state: Option<LegacyReadState>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LegacyReadState {
    pub participant_id: Option<LegacyParticipantId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LegacyParticipant {
    pub id: Option<LegacyParticipantId>,
    pub fallback_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LegacyParticipantId {
    pub gaia_id: Option<String>,
}

impl LegacyParticipantId {
    pub fn gaia(&self) -> Option<&str> {
        self.gaia_id.as_deref().filter(|g| !g.is_empty())
    }
}

/// Microsecond timestamp stored as a string or a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LegacyTimestamp {
    Text(String),
    Number(i64),
}

impl LegacyTimestamp {
    pub fn micros(&self) -> Option<i64> {
        match self {
            LegacyTimestamp::Text(s) => s.trim().parse().ok(),
            LegacyTimestamp::Number(n) => Some(*n),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LegacyEvent {
    pub sender_id: Option<LegacyParticipantId>,
    pub timestamp: Option<LegacyTimestamp>,
    pub chat_message: Option<LegacyChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct LegacyChatMessage {
    pub message_content: Option<LegacyMessageContent>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LegacyMessageContent {
    #[serde(default)]
    pub segment: Vec<LegacySegment>,
    #[serde(default)]
    pub attachment: Vec<LegacyAttachment>,
}

#[derive(Debug, Deserialize)]
pub struct LegacySegment {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LegacyAttachment {
    pub embed_item: Option<LegacyEmbedItem>,
}

#[derive(Debug, Deserialize)]
pub struct LegacyEmbedItem {
    #[serde(alias = "embeds.PlusPhoto.plus_photo")]
    pub plus_photo: Option<LegacyPlusPhoto>,
}

#[derive(Debug, Deserialize)]
pub struct LegacyPlusPhoto {
    pub url: Option<String>,
}

impl LegacyEvent {
    pub fn sender(&self) -> Option<&str> {
        self.sender_id.as_ref()?.gaia()
    }

    /// Segment texts joined in order; line-break segments become `\n`.
    pub fn text(&self) -> String {
        let Some(content) = self.content() else {
            return String::new();
        };
        content
            .segment
            .iter()
            .map(|s| match (s.kind.as_deref(), s.text.as_deref()) {
                (Some("LINE_BREAK"), None) => "\n",
                (_, Some(text)) => text,
                _ => "",
            })
            .collect()
    }

    /// Photo URLs from `embed_item.plus_photo`.
    pub fn photo_urls(&self) -> Vec<&str> {
        self.content()
            .map(|c| {
                c.attachment
                    .iter()
                    .filter_map(|a| a.embed_item.as_ref()?.plus_photo.as_ref()?.url.as_deref())
                    .filter(|u| !u.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn content(&self) -> Option<&LegacyMessageContent> {
        self.chat_message.as_ref()?.message_content.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_layout() {
        let export: LegacyExport = serde_json::from_value(json!({
            "conversation_state": [{
                "conversation_id": {"id": "c1"},
                "conversation_state": {
                    "conversation": {
                        "self_conversation_state": {"self_read_state": {"participant_id": {"gaia_id": "1"}}},
                        "participant_data": [
                            {"id": {"gaia_id": "1"}, "fallback_name": "Me"},
                            {"id": {"gaia_id": "2"}, "fallback_name": "Bob"}
                        ]
                    },
                    "event": [{}]
                }
            }]
        }))
        .unwrap();

        let entry = &export.conversation_state[0];
        assert_eq!(entry.key(0), "c1");
        let conv = entry.state().conversation.as_ref().unwrap();
        assert_eq!(conv.self_gaia_id(), Some("1"));
        assert_eq!(conv.display_name("2"), "Bob");
        assert_eq!(conv.display_name("3"), "3");
        assert_eq!(conv.other_ids(Some("1")).collect::<Vec<_>>(), vec!["2"]);
        assert_eq!(entry.state().event.len(), 1);
    }

    #[test]
    fn test_inline_layout() {
        let export: LegacyExport = serde_json::from_value(json!({
            "conversation_state": [{
                "conversation": {"participant_data": [{"id": {"gaia_id": "7"}}]},
                "event": [{}, {}]
            }]
        }))
        .unwrap();

        let entry = &export.conversation_state[0];
        assert_eq!(entry.key(3), "conversation-3");
        assert_eq!(entry.state().event.len(), 2);
        assert!(entry.state().conversation.as_ref().unwrap().self_gaia_id().is_none());
    }

    #[test]
    fn test_event_text_and_photos() {
        let event: LegacyEvent = serde_json::from_value(json!({
            "sender_id": {"gaia_id": "2"},
            "timestamp": "1700000000000000",
            "chat_message": {"message_content": {
                "segment": [
                    {"type": "TEXT", "text": "line one"},
                    {"type": "LINE_BREAK"},
                    {"type": "LINK", "text": "https://x.com"}
                ],
                "attachment": [
                    {"embed_item": {"embeds.PlusPhoto.plus_photo": {"url": "https://photos/1.jpg"}}}
                ]
            }}
        }))
        .unwrap();

        assert_eq!(event.sender(), Some("2"));
        assert_eq!(event.timestamp.as_ref().unwrap().micros(), Some(1_700_000_000_000_000));
        assert_eq!(event.text(), "line one\nhttps://x.com");
        assert_eq!(event.photo_urls(), vec!["https://photos/1.jpg"]);
    }

    #[test]
    fn test_numeric_timestamp() {
        let ts: LegacyTimestamp = serde_json::from_value(json!(1700000000000000_i64)).unwrap();
        assert_eq!(ts.micros(), Some(1_700_000_000_000_000));
    }
}
