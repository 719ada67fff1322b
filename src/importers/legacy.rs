//! Legacy chat export importer (`Hangouts.json`).
//!
//! Conversations usually declare their owner through
//! `self_conversation_state`. When a conversation lacks it, the owner falls
//! back to the sender id seen in the most conversations across the file.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::contact::Contact;
use crate::error::{Result, UnifyError};
use crate::identity::{IdentityResolver, Resolution, classify};
use crate::importer::{ImportBatch, ImportContext, Importer, Source};
use crate::message::{Direction, MediaAttachment, Message};
use crate::parsing::legacy::{LegacyConversation, LegacyEvent, LegacyExport};
use crate::timestamp::{EpochUnit, to_utc};

use super::{SNIFF_BYTES, has_extension, read_head};

/// Importer for legacy `conversation_state` JSON exports.
#[derive(Debug, Default)]
pub struct LegacyImporter;

impl LegacyImporter {
    pub fn new() -> Self {
        Self
    }

    /// Imports an export already in memory.
    pub fn parse_str(&self, content: &str, ctx: &ImportContext) -> Result<ImportBatch> {
        self.parse_content(content, None, ctx)
    }

    fn parse_content(
        &self,
        content: &str,
        path: Option<&Path>,
        ctx: &ImportContext,
    ) -> Result<ImportBatch> {
        let export: LegacyExport = serde_json::from_str(content)
            .map_err(|e| UnifyError::legacy_parse(e, path.map(Path::to_path_buf)))?;
        if export.conversation_state.is_empty() {
            return Err(UnifyError::invalid_format(
                "legacy chat",
                "no conversations in conversation_state",
            ));
        }

        // Decode events once, keeping conversation order.
        let mut skipped = 0;
        let mut decoded: Vec<(String, Option<&LegacyConversation>, Vec<LegacyEvent>)> =
            Vec::with_capacity(export.conversation_state.len());
        for (index, entry) in export.conversation_state.iter().enumerate() {
            let state = entry.state();
            let mut events = Vec::with_capacity(state.event.len());
            for value in &state.event {
                match serde_json::from_value::<LegacyEvent>(value.clone()) {
                    Ok(event) => events.push(event),
                    Err(_) => skipped += 1,
                }
            }
            decoded.push((entry.key(index), state.conversation.as_ref(), events));
        }

        let fallback_self = resolve_fallback(&decoded);

        let mut messages = Vec::new();
        for (key, conversation, events) in &decoded {
            let self_id = conversation
                .and_then(LegacyConversation::self_gaia_id)
                .map(str::to_string)
                .or_else(|| fallback_self.clone());
            let names = Names {
                conversation: *conversation,
                self_id: self_id.as_deref(),
                ctx,
            };
            let label = names.label(key);

            for event in events {
                let Some(sender) = event.sender() else {
                    skipped += 1;
                    continue;
                };
                let Some(timestamp) = event
                    .timestamp
                    .as_ref()
                    .and_then(|t| t.micros())
                    .and_then(|micros| to_utc(micros, EpochUnit::Micros))
                else {
                    skipped += 1;
                    continue;
                };

                let direction = classify(Some(sender), self_id.as_deref());
                let to = match direction {
                    Direction::Sent => names.peer(sender, &label),
                    Direction::Received => names.owner(),
                    Direction::Unknown => Contact::new(label.as_str()),
                };
                let attachments = event
                    .photo_urls()
                    .into_iter()
                    .map(MediaAttachment::from_path_guess)
                    .collect();

                let message =
                    Message::new(Source::Legacy.tag(), names.person(sender), to, timestamp)
                        .with_body(event.text().trim())
                        .with_direction(direction)
                        .with_attachments(attachments)
                        .with_conversation(label.as_str());

                // Membership changes and hangout events carry no content
                if message.is_empty() {
                    skipped += 1;
                } else {
                    messages.push(message);
                }
            }
        }

        if skipped > 0 {
            debug!(skipped, "skipped legacy events without content");
        }
        Ok(ImportBatch::new(messages, skipped).with_local_identity(fallback_self))
    }
}

/// Owner id for conversations that do not declare one.
fn resolve_fallback(
    decoded: &[(String, Option<&LegacyConversation>, Vec<LegacyEvent>)],
) -> Option<String> {
    let mut declared = decoded
        .iter()
        .filter_map(|(_, conv, _)| conv.and_then(LegacyConversation::self_gaia_id));
    if let Some(id) = declared.next() {
        return Some(id.to_string());
    }

    let mut resolver = IdentityResolver::new();
    for (key, _, events) in decoded {
        for sender in events.iter().filter_map(LegacyEvent::sender) {
            resolver.observe(key, sender);
        }
    }
    match resolver.resolve() {
        Resolution::Resolved(id) => {
            info!(gaia_id = %id, "inferred legacy account owner");
            Some(id)
        }
        Resolution::Tie(candidates) => {
            warn!(?candidates, "legacy account owner is ambiguous");
            None
        }
        Resolution::NoSignal => None,
    }
}

/// Contact naming inside one conversation.
struct Names<'a> {
    conversation: Option<&'a LegacyConversation>,
    self_id: Option<&'a str>,
    ctx: &'a ImportContext,
}

impl Names<'_> {
    fn person(&self, gaia_id: &str) -> Contact {
        if self.self_id == Some(gaia_id) {
            return self.owner();
        }
        match self.conversation {
            Some(conv) => Contact::new(conv.display_name(gaia_id)),
            None => Contact::new(gaia_id),
        }
    }

    fn owner(&self) -> Contact {
        let named = self.conversation.zip(self.self_id).and_then(|(conv, id)| {
            conv.participant(id)?
                .fallback_name
                .as_deref()
                .filter(|n| !n.trim().is_empty())
                .map(Contact::new)
        });
        named.unwrap_or_else(|| self.ctx.self_contact().clone())
    }

    /// Recipient of a sent message: the single other participant, else the
    /// conversation itself.
    fn peer(&self, sender: &str, label: &str) -> Contact {
        let Some(conv) = self.conversation else {
            return Contact::new(label);
        };
        let others: Vec<&str> = conv
            .other_ids(self.self_id)
            .filter(|id| *id != sender)
            .collect();
        match others.as_slice() {
            [only] => Contact::new(conv.display_name(only)),
            _ => Contact::new(label),
        }
    }

    /// Conversation name, else the other participants' names, else the key.
    fn label(&self, key: &str) -> String {
        let Some(conv) = self.conversation else {
            return key.to_string();
        };
        if let Some(name) = conv.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.trim().to_string();
        }
        let others: Vec<String> = conv
            .other_ids(self.self_id)
            .map(|id| conv.display_name(id))
            .collect();
        if others.is_empty() {
            key.to_string()
        } else {
            others.join(", ")
        }
    }
}

impl Importer for LegacyImporter {
    fn name(&self) -> &'static str {
        "Legacy Chat"
    }

    fn source(&self) -> Source {
        Source::Legacy
    }

    fn can_import(&self, path: &Path) -> bool {
        path.is_file()
            && has_extension(path, "json")
            && read_head(path, SNIFF_BYTES).is_some_and(|head| head.contains("\"conversation_state\""))
    }

    fn import(&self, path: &Path, ctx: &ImportContext) -> Result<ImportBatch> {
        let content = fs::read_to_string(path)?;
        let batch = self.parse_content(&content, Some(path), ctx)?;
        info!(path = %path.display(), messages = batch.len(), "imported legacy chat export");
        Ok(batch)
    }
}
