//! Groupware chat export importer.
//!
//! The export has no sent/received flag, only a creator per message, so
//! import is two-pass: every conversation is read first and fed to the
//! [`IdentityResolver`], then messages are mapped with the resolved owner.
//! Addresses configured with
//! [`ImportContext::with_local_email`] replace the heuristic.
//!
//! Accepted layouts below the detected directory, tried in order:
//!
//! - `Google Chat/Groups/<conversation>/messages.json`
//! - `Groups/<conversation>/messages.json`
//! - `<conversation>/messages.json`
//! - `messages.json` (the directory is one conversation)

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::GroupChatConfig;
use crate::contact::Contact;
use crate::error::{Result, UnifyError};
use crate::identity::{IdentityResolver, Resolution, classify};
use crate::importer::{ImportBatch, ImportContext, Importer, Source};
use crate::message::{Direction, MediaAttachment, Message};
use crate::parsing::groupchat::{GroupInfo, Participant, RawGroupMessage, message_values};

use super::{SNIFF_BYTES, find_child_ci, read_head, resolve_ci};

/// Directories that hold one subdirectory per conversation.
const GROUP_LAYOUTS: &[&str] = &["Google Chat/Groups", "Groups", ""];

/// One conversation after the first pass.
#[derive(Debug)]
struct Conversation {
    key: String,
    label: String,
    info: GroupInfo,
    messages: Vec<Option<RawGroupMessage>>,
}

impl Conversation {
    /// Members from `group_info.json`, or the distinct creators seen.
    fn participants(&self) -> Vec<Participant> {
        if !self.info.members.is_empty() {
            return self.info.members.clone();
        }
        let mut seen: Vec<Participant> = Vec::new();
        for raw in self.messages.iter().flatten() {
            let p = raw.resolved_creator(&self.info);
            if !seen.iter().any(|s| same_person(s, &p)) {
                seen.push(p);
            }
        }
        seen
    }
}

fn same_person(a: &Participant, b: &Participant) -> bool {
    match (&a.email, &b.email) {
        (Some(x), Some(y)) => x == y,
        _ => match (&a.id, &b.id) {
            (Some(x), Some(y)) => x == y,
            _ => a.name.is_some() && a.name == b.name,
        },
    }
}

/// How the local user is recognized in this import.
#[derive(Debug)]
enum Owner<'a> {
    /// Addresses declared on the context.
    Configured(&'a ImportContext),
    /// Result of the identity heuristic.
    Inferred(Option<String>),
}

impl Owner<'_> {
    fn direction(&self, creator_email: Option<&str>) -> Direction {
        match self {
            Owner::Configured(ctx) => match creator_email {
                Some(email) if ctx.is_local_email(email) => Direction::Sent,
                Some(_) => Direction::Received,
                None => Direction::Unknown,
            },
            Owner::Inferred(identity) => classify(creator_email, identity.as_deref()),
        }
    }

    fn is_owner(&self, email: &str) -> bool {
        self.direction(Some(email)) == Direction::Sent
    }

    fn identity(&self) -> Option<String> {
        match self {
            Owner::Configured(ctx) => ctx.local_emails().iter().next().cloned(),
            Owner::Inferred(identity) => identity.clone(),
        }
    }
}

/// Importer for groupware chat directories.
#[derive(Debug, Default)]
pub struct GroupChatImporter;

impl GroupChatImporter {
    pub fn new() -> Self {
        Self
    }

    fn is_conversation_file(path: &Path) -> bool {
        path.is_file()
            && read_head(path, SNIFF_BYTES).is_some_and(|head| head.contains("\"creator\""))
    }

    /// Conversation directories under `root`, using the first layout that
    /// yields any.
    pub fn conversation_dirs(&self, root: &Path, config: &GroupChatConfig) -> Vec<PathBuf> {
        if !root.is_dir() {
            return Vec::new();
        }
        for layout in GROUP_LAYOUTS {
            let Some(groups) = resolve_ci(root, layout).filter(|p| p.is_dir()) else {
                continue;
            };
            let Ok(entries) = fs::read_dir(&groups) else {
                continue;
            };
            let mut dirs: Vec<PathBuf> = entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .filter(|p| {
                    find_child_ci(p, &config.conversation_file)
                        .is_some_and(|f| Self::is_conversation_file(&f))
                })
                .collect();
            if !dirs.is_empty() {
                dirs.sort();
                return dirs;
            }
        }
        match find_child_ci(root, &config.conversation_file) {
            Some(file) if Self::is_conversation_file(&file) => vec![root.to_path_buf()],
            _ => Vec::new(),
        }
    }

    fn load_conversation(&self, dir: &Path, config: &GroupChatConfig) -> Result<Conversation> {
        let file = find_child_ci(dir, &config.conversation_file).ok_or_else(|| {
            UnifyError::invalid_format("group chat", format!("no {}", config.conversation_file))
        })?;
        let content = fs::read_to_string(&file)?;
        let root: Value = serde_json::from_str(&content)
            .map_err(|e| UnifyError::groupchat_parse(e, Some(file.clone())))?;
        let values = message_values(&root).ok_or_else(|| {
            UnifyError::invalid_format("group chat", "expected an array or a messages array")
        })?;

        let info = find_child_ci(dir, &config.group_info_file)
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|s| serde_json::from_str::<Value>(&s).ok())
            .map(|v| GroupInfo::from_value(&v))
            .unwrap_or_default();

        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "conversation".to_string());

        Ok(Conversation {
            key: dir.display().to_string(),
            label: info.name.clone().unwrap_or(dir_name),
            messages: values.iter().map(RawGroupMessage::from_value).collect(),
            info,
        })
    }

    /// Imports already-loaded conversations: `(label, messages.json, group_info.json)`.
    pub fn parse_conversations(
        &self,
        conversations: &[(&str, &str, Option<&str>)],
        ctx: &ImportContext,
    ) -> Result<ImportBatch> {
        let mut loaded = Vec::with_capacity(conversations.len());
        for (label, messages, group_info) in conversations {
            let root: Value =
                serde_json::from_str(messages).map_err(|e| UnifyError::groupchat_parse(e, None))?;
            let values = message_values(&root).ok_or_else(|| {
                UnifyError::invalid_format("group chat", "expected an array or a messages array")
            })?;
            let info = group_info
                .and_then(|s| serde_json::from_str::<Value>(s).ok())
                .map(|v| GroupInfo::from_value(&v))
                .unwrap_or_default();
            loaded.push(Conversation {
                key: (*label).to_string(),
                label: info.name.clone().unwrap_or_else(|| (*label).to_string()),
                messages: values.iter().map(RawGroupMessage::from_value).collect(),
                info,
            });
        }
        Ok(self.map_conversations(&loaded, ctx, 0))
    }

    fn resolve_owner<'a>(&self, conversations: &[Conversation], ctx: &'a ImportContext) -> Owner<'a> {
        if !ctx.local_emails().is_empty() {
            return Owner::Configured(ctx);
        }

        let mut resolver = IdentityResolver::new();
        for conv in conversations {
            for raw in conv.messages.iter().flatten() {
                if let Some(email) = raw.creator_email(&conv.info) {
                    resolver.observe(&conv.key, email);
                }
            }
        }

        match resolver.resolve() {
            Resolution::Resolved(identity) => {
                info!(
                    identity = %identity,
                    conversations = resolver.conversation_count(&identity),
                    "resolved local user"
                );
                Owner::Inferred(Some(identity))
            }
            Resolution::Tie(candidates) => {
                warn!(?candidates, "local user is ambiguous, directions stay unknown");
                Owner::Inferred(None)
            }
            Resolution::NoSignal => {
                warn!("no creator emails found, directions stay unknown");
                Owner::Inferred(None)
            }
        }
    }

    fn map_conversations(
        &self,
        conversations: &[Conversation],
        ctx: &ImportContext,
        unreadable: usize,
    ) -> ImportBatch {
        let owner = self.resolve_owner(conversations, ctx);
        let offset = ctx.config().timestamp.naive_offset();

        // Best-known participant record per email, for naming the owner.
        let mut known: HashMap<String, Participant> = HashMap::new();
        for conv in conversations {
            for p in conv.participants() {
                if let Some(email) = p.email.clone() {
                    let entry = known.entry(email).or_insert_with(|| p.clone());
                    if entry.name.is_none() {
                        entry.name = p.name.clone();
                    }
                }
            }
        }
        let owner_contact = match owner.identity() {
            Some(id) => known
                .get(&id)
                .map(Participant::contact)
                .unwrap_or_else(|| Contact::new(ctx.self_contact().name()).with_email(&id)),
            None => ctx.self_contact().clone(),
        };

        let mut skipped = unreadable;
        let mut messages = Vec::new();
        for conv in conversations {
            let participants = conv.participants();
            let conversation_contact = Contact::new(conv.label.as_str());

            for raw in &conv.messages {
                let Some(raw) = raw else {
                    skipped += 1;
                    continue;
                };
                let Some(timestamp) = raw.timestamp.as_ref().and_then(|t| t.to_utc(offset)) else {
                    debug!(conversation = %conv.label, "skipping message without a readable timestamp");
                    skipped += 1;
                    continue;
                };

                let creator = raw.resolved_creator(&conv.info);
                let direction = owner.direction(creator.email.as_deref());
                let to = match direction {
                    Direction::Sent => {
                        let others: Vec<&Participant> = participants
                            .iter()
                            .filter(|p| {
                                !same_person(p, &creator)
                                    && !p.email.as_deref().is_some_and(|e| owner.is_owner(e))
                            })
                            .collect();
                        match others.as_slice() {
                            [only] => only.contact(),
                            _ => conversation_contact.clone(),
                        }
                    }
                    Direction::Received => owner_contact.clone(),
                    Direction::Unknown => conversation_contact.clone(),
                };

                let attachments = raw
                    .files
                    .iter()
                    .map(|f| MediaAttachment::from_path_guess(format!("{}/{}", conv.label, f)))
                    .collect();

                let message = Message::new(Source::GroupChat.tag(), creator.contact(), to, timestamp)
                    .with_body(raw.text.trim())
                    .with_direction(direction)
                    .with_attachments(attachments)
                    .with_conversation(conv.label.as_str());

                if message.is_empty() {
                    skipped += 1;
                } else {
                    messages.push(message);
                }
            }
        }

        ImportBatch::new(messages, skipped).with_local_identity(owner.identity())
    }
}

impl Importer for GroupChatImporter {
    fn name(&self) -> &'static str {
        "Group Chat"
    }

    fn source(&self) -> Source {
        Source::GroupChat
    }

    fn can_import(&self, path: &Path) -> bool {
        !self
            .conversation_dirs(path, &GroupChatConfig::default())
            .is_empty()
    }

    fn import(&self, path: &Path, ctx: &ImportContext) -> Result<ImportBatch> {
        let config = &ctx.config().groupchat;
        let dirs = self.conversation_dirs(path, config);
        if dirs.is_empty() {
            return Err(UnifyError::invalid_format(
                "group chat",
                format!("no {} under {}", config.conversation_file, path.display()),
            ));
        }

        let mut conversations = Vec::with_capacity(dirs.len());
        let mut unreadable = 0;
        let mut last_error = None;
        for dir in &dirs {
            match self.load_conversation(dir, config) {
                Ok(conv) => conversations.push(conv),
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "skipping unreadable conversation");
                    unreadable += 1;
                    last_error = Some(e);
                }
            }
        }
        if conversations.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        let batch = self.map_conversations(&conversations, ctx, unreadable);
        info!(
            path = %path.display(),
            conversations = conversations.len(),
            messages = batch.len(),
            "imported group chat export"
        );
        Ok(batch)
    }
}
