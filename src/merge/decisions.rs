//! Persisted merge decisions.
//!
//! The log is a JSON array of [`MergeDecision`] records. It only grows:
//! a new decision is appended and the file is rewritten through a temporary
//! sibling and a rename, so a crash mid-write leaves the previous log intact.
//!
//! ```json
//! [
//!   {
//!     "sourceSignatures": ["john||", "johnny||"],
//!     "targetName": "Johnny",
//!     "targetPhones": [],
//!     "targetEmails": [],
//!     "isSkipped": false,
//!     "reason": "same person",
//!     "decidedAt": "2024-01-15T10:30:00Z"
//!   }
//! ]
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::contact::{Contact, ContactSignature};
use crate::error::{Result, UnifyError};

use super::apply::MergePlan;

/// One operator decision about a candidate group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeDecision {
    /// Signatures of the raw contacts the decision covers, sorted.
    pub source_signatures: Vec<ContactSignature>,
    pub target_name: String,
    #[serde(default)]
    pub target_phones: Vec<String>,
    #[serde(default)]
    pub target_emails: Vec<String>,
    #[serde(default)]
    pub is_skipped: bool,
    #[serde(default)]
    pub reason: String,
    pub decided_at: DateTime<Utc>,
}

fn sorted(mut signatures: Vec<ContactSignature>) -> Vec<ContactSignature> {
    signatures.sort();
    signatures.dedup();
    signatures
}

impl MergeDecision {
    /// Confirms that `sources` are all `target`.
    pub fn merge(sources: Vec<ContactSignature>, target: &Contact, reason: &str) -> Self {
        Self {
            source_signatures: sorted(sources),
            target_name: target.name().to_string(),
            target_phones: target.phone_numbers().iter().cloned().collect(),
            target_emails: target.emails().iter().cloned().collect(),
            is_skipped: false,
            reason: reason.to_string(),
            decided_at: Utc::now(),
        }
    }

    /// Declines to merge `sources`.
    pub fn skip(sources: Vec<ContactSignature>, reason: &str) -> Self {
        Self {
            source_signatures: sorted(sources),
            target_name: String::new(),
            target_phones: Vec::new(),
            target_emails: Vec::new(),
            is_skipped: true,
            reason: reason.to_string(),
            decided_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_decided_at(mut self, at: DateTime<Utc>) -> Self {
        self.decided_at = at;
        self
    }

    /// Canonical contact this decision maps its sources to.
    pub fn target(&self) -> Contact {
        let contact = Contact::new(self.target_name.as_str());
        let contact = self
            .target_phones
            .iter()
            .fold(contact, |c, phone| c.with_phone(phone));
        self.target_emails
            .iter()
            .fold(contact, |c, email| c.with_email(email))
    }

    /// Returns `true` if this decision names exactly `signatures`.
    pub fn covers_exactly(&self, signatures: &[ContactSignature]) -> bool {
        self.source_signatures == sorted(signatures.to_vec())
    }
}

/// Append-only collection of decisions, optionally backed by a file.
#[derive(Debug, Clone, Default)]
pub struct DecisionLog {
    path: Option<PathBuf>,
    decisions: Vec<MergeDecision>,
}

impl DecisionLog {
    /// In-memory log that is never persisted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the log at `path`. A missing file is an empty log that will be
    /// created on the first [`record`](Self::record).
    ///
    /// # Errors
    ///
    /// Returns [`UnifyError::DecisionLog`] if the file exists but is not a
    /// decision array.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let decisions = match fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| UnifyError::decision_log(path, e.to_string()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), decisions = decisions.len(), "loaded decision log");
        Ok(Self {
            path: Some(path.to_path_buf()),
            decisions,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn decisions(&self) -> &[MergeDecision] {
        &self.decisions
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// Accepted (non-skipped) decisions in log order.
    pub fn accepted(&self) -> impl Iterator<Item = &MergeDecision> {
        self.decisions.iter().filter(|d| !d.is_skipped)
    }

    /// Returns `true` if a skip decision names exactly `signatures`.
    pub fn is_skipped(&self, signatures: &[ContactSignature]) -> bool {
        let wanted = sorted(signatures.to_vec());
        self.decisions
            .iter()
            .any(|d| d.is_skipped && d.source_signatures == wanted)
    }

    /// Mapping from raw identities to canonical contacts for every accepted
    /// decision.
    pub fn plan(&self) -> MergePlan {
        MergePlan::from_decisions(self.accepted())
    }

    /// Appends `decision` and persists the log if it is file-backed.
    ///
    /// # Errors
    ///
    /// Returns an IO or JSON error if the log file cannot be written. The
    /// in-memory log keeps the decision either way.
    pub fn record(&mut self, decision: MergeDecision) -> Result<()> {
        info!(
            sources = decision.source_signatures.len(),
            skipped = decision.is_skipped,
            target = %decision.target_name,
            "recording merge decision"
        );
        self.decisions.push(decision);
        self.save()
    }

    /// Writes the log to its file. No-op for in-memory logs.
    ///
    /// # Errors
    ///
    /// Returns an IO or JSON error if writing fails.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.decisions)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
