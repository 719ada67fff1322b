//! Social-network message export importer.
//!
//! Handles Meta's JSON exports (from the "Download Your Data" feature). The
//! main quirk is that Meta exports UTF-8 text encoded as ISO-8859-1,
//! causing Cyrillic and other non-ASCII text to appear as garbage
//! (Mojibake); see [`fix_mojibake_encoding`](crate::parsing::social::fix_mojibake_encoding).

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{Result, UnifyError};
use crate::importer::{ImportBatch, ImportContext, Importer, Source};
use crate::parsing::social::{SocialExport, SocialMapping, SocialRawMessage, parse_social_message};

use super::{SNIFF_BYTES, has_extension, lower_file_name, read_head};

/// Importer for social-network `message_N.json` files.
#[derive(Debug, Default)]
pub struct SocialImporter;

impl SocialImporter {
    pub fn new() -> Self {
        Self
    }

    /// Imports one export file already in memory.
    pub fn parse_str(&self, content: &str, ctx: &ImportContext) -> Result<ImportBatch> {
        self.parse_content(content, None, ctx)
    }

    fn parse_content(
        &self,
        content: &str,
        path: Option<&Path>,
        ctx: &ImportContext,
    ) -> Result<ImportBatch> {
        let export: SocialExport = serde_json::from_str(content)
            .map_err(|e| UnifyError::social_parse(e, path.map(Path::to_path_buf)))?;
        let mapping = SocialMapping::for_export(
            &export,
            &ctx.config().social,
            ctx.self_contact(),
            Source::Social.tag(),
        );

        let mut skipped = 0;
        let mut messages = Vec::with_capacity(export.messages.len());
        for value in &export.messages {
            let parsed = serde_json::from_value::<SocialRawMessage>(value.clone())
                .ok()
                .and_then(|raw| parse_social_message(&raw, &mapping));
            match parsed {
                Some(msg) => messages.push(msg),
                None => skipped += 1,
            }
        }

        // Exports store messages newest-first, reverse for chronological order
        messages.reverse();

        if skipped > 0 {
            debug!(skipped, "skipped empty or malformed social messages");
        }
        Ok(ImportBatch::new(messages, skipped))
    }
}

impl Importer for SocialImporter {
    fn name(&self) -> &'static str {
        "Social Messages"
    }

    fn source(&self) -> Source {
        Source::Social
    }

    fn can_import(&self, path: &Path) -> bool {
        if !path.is_file() || !has_extension(path, "json") {
            return false;
        }
        let name = lower_file_name(path);
        if name.starts_with("message_") {
            return true;
        }
        read_head(path, SNIFF_BYTES)
            .is_some_and(|head| head.contains("\"participants\"") && head.contains("\"sender_name\""))
    }

    fn import(&self, path: &Path, ctx: &ImportContext) -> Result<ImportBatch> {
        let content = fs::read_to_string(path)?;
        let batch = self.parse_content(&content, Some(path), ctx)?;
        info!(path = %path.display(), messages = batch.len(), "imported social export");
        Ok(batch)
    }
}
