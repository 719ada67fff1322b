//! Groupware chat export records.
//!
//! Each conversation directory holds a `messages.json` (either a bare array
//! or `{"messages": [...]}`) and optionally a `group_info.json` with the
//! member list. Field names drifted between export versions, so every field
//! is looked up through a list of known spellings.

use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;

use crate::contact::Contact;
use crate::timestamp::{EpochUnit, parse_date_str, parse_epoch_str, to_utc};

const CREATOR_ID_KEYS: &[&str] = &["user_id", "id"];
const CREATOR_NAME_KEYS: &[&str] = &["name", "display_name"];
const CREATOR_EMAIL_KEYS: &[&str] = &["email"];
const MEMBER_ID_KEYS: &[&str] = &["id", "user_id", "gaia_id"];
const MEMBER_NAME_KEYS: &[&str] = &["name", "display_name", "fallback_name"];
const MEMBER_EMAIL_KEYS: &[&str] = &["email", "user_email", "email_address"];
const TIMESTAMP_KEYS: &[&str] = &["created_date", "timestamp"];
const TEXT_KEYS: &[&str] = &["text", "content"];

/// First non-empty string (or number rendered as string) under any of `keys`.
pub fn str_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match value.get(k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Person who wrote a message, or a member of the group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Participant {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Participant {
    fn from_value(value: &Value, id_keys: &[&str], name_keys: &[&str], email_keys: &[&str]) -> Self {
        Self {
            id: str_field(value, id_keys),
            name: str_field(value, name_keys),
            email: str_field(value, email_keys).map(|e| e.to_lowercase()),
        }
    }

    /// Contact for this participant: best available name, plus the email.
    pub fn contact(&self) -> Contact {
        let name = self
            .name
            .as_deref()
            .or(self.email.as_deref())
            .or(self.id.as_deref())
            .unwrap_or("Unknown");
        match self.email.as_deref() {
            Some(email) => Contact::new(name).with_email(email),
            None => Contact::new(name),
        }
    }
}

/// Contents of `group_info.json`.
#[derive(Debug, Clone, Default)]
pub struct GroupInfo {
    pub name: Option<String>,
    pub members: Vec<Participant>,
}

impl GroupInfo {
    /// Reads the member list. Unknown shapes yield an empty list.
    pub fn from_value(value: &Value) -> Self {
        let members = value
            .get("members")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .map(|m| {
                        Participant::from_value(m, MEMBER_ID_KEYS, MEMBER_NAME_KEYS, MEMBER_EMAIL_KEYS)
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            name: str_field(value, &["name", "group_name"]),
            members,
        }
    }

    /// Member matching `creator` by id, then by case-insensitive name.
    pub fn find_member(&self, creator: &Participant) -> Option<&Participant> {
        let by_id = creator
            .id
            .as_deref()
            .and_then(|id| self.members.iter().find(|m| m.id.as_deref() == Some(id)));
        by_id.or_else(|| {
            let name = creator.name.as_deref()?;
            self.members.iter().find(|m| {
                m.name
                    .as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
            })
        })
    }
}

/// Raw timestamp value as found in the export.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTimestamp {
    Number(i64),
    Text(String),
}

impl RawTimestamp {
    fn from_value(value: &Value) -> Option<Self> {
        TIMESTAMP_KEYS.iter().find_map(|k| match value.get(k)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .map(RawTimestamp::Number),
            Value::String(s) if !s.trim().is_empty() => Some(RawTimestamp::Text(s.clone())),
            _ => None,
        })
    }

    /// Resolves to UTC. Numbers use the seconds/milliseconds threshold;
    /// text is tried as a number first, then as a date string.
    pub fn to_utc(&self, naive_offset: FixedOffset) -> Option<DateTime<Utc>> {
        match self {
            RawTimestamp::Number(n) => to_utc(*n, EpochUnit::Auto),
            RawTimestamp::Text(s) => parse_epoch_str(s, EpochUnit::Auto)
                .or_else(|| parse_date_str(s, naive_offset)),
        }
    }
}

/// One message before direction classification.
#[derive(Debug, Clone)]
pub struct RawGroupMessage {
    pub creator: Participant,
    pub timestamp: Option<RawTimestamp>,
    pub text: String,
    /// Exported file names from `attached_files`.
    pub files: Vec<String>,
}

impl RawGroupMessage {
    pub fn from_value(value: &Value) -> Option<Self> {
        let creator = value.get("creator").map(|c| {
            Participant::from_value(c, CREATOR_ID_KEYS, CREATOR_NAME_KEYS, CREATOR_EMAIL_KEYS)
        })?;
        Some(Self {
            creator,
            timestamp: RawTimestamp::from_value(value),
            text: TEXT_KEYS
                .iter()
                .find_map(|k| value.get(k).and_then(Value::as_str))
                .unwrap_or_default()
                .to_string(),
            files: value
                .get("attached_files")
                .and_then(Value::as_array)
                .map(|files| {
                    files
                        .iter()
                        .filter_map(|f| str_field(f, &["export_name", "original_name"]))
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    /// Creator email, falling back to the group member list.
    pub fn creator_email<'a>(&'a self, info: &'a GroupInfo) -> Option<&'a str> {
        self.creator
            .email
            .as_deref()
            .or_else(|| info.find_member(&self.creator)?.email.as_deref())
    }

    /// Creator with missing fields filled in from the member list.
    pub fn resolved_creator(&self, info: &GroupInfo) -> Participant {
        let member = info.find_member(&self.creator);
        Participant {
            id: self
                .creator
                .id
                .clone()
                .or_else(|| member.and_then(|m| m.id.clone())),
            name: self
                .creator
                .name
                .clone()
                .or_else(|| member.and_then(|m| m.name.clone())),
            email: self.creator_email(info).map(str::to_string),
        }
    }
}

/// Splits a conversation file into raw message values.
///
/// Accepts a bare array or an object with a `messages` array; anything else
/// is `None`.
pub fn message_values(root: &Value) -> Option<&Vec<Value>> {
    match root {
        Value::Array(arr) => Some(arr),
        Value::Object(_) => root.get("messages").and_then(Value::as_array),
        _ => None,
    }
}
