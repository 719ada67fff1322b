//! SMS/MMS backup XML importer.
//!
//! Handles the `<smses>` document written by Android backup apps. The
//! backup carries an explicit direction code on every record, so no
//! identity resolution is needed.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{Result, UnifyError};
use crate::importer::{ImportBatch, ImportContext, Importer, Source};
use crate::parsing::sms::{RawRecord, SmsMapping, map_mms, map_sms, read_records};

use super::{SNIFF_BYTES, file_label, has_extension, read_head};

/// Importer for SMS backup XML files.
///
/// # Example
///
/// ```rust
/// use chatunify::importer::{ImportContext, Importer};
/// use chatunify::importers::SmsImporter;
///
/// let importer = SmsImporter::new();
/// assert_eq!(importer.name(), "SMS Backup");
/// ```
#[derive(Debug, Default)]
pub struct SmsImporter;

impl SmsImporter {
    pub fn new() -> Self {
        Self
    }

    /// Imports backup XML already in memory. `label` prefixes attachment locators.
    pub fn parse_str(&self, xml: &str, label: &str, ctx: &ImportContext) -> Result<ImportBatch> {
        let records = read_records(xml).map_err(|e| UnifyError::sms_parse(e, None))?;
        let mapping = SmsMapping {
            config: &ctx.config().sms,
            self_contact: ctx.self_contact(),
            file_label: label,
            source_tag: Source::Sms.tag(),
        };

        let total = records.len();
        let mut mms_index = 0;
        let messages: Vec<_> = records
            .iter()
            .filter_map(|record| match record {
                RawRecord::Sms(attrs) => map_sms(attrs, &mapping),
                RawRecord::Mms(mms) => {
                    mms_index += 1;
                    map_mms(mms, mms_index - 1, &mapping)
                }
            })
            .collect();

        let skipped = total - messages.len();
        if skipped > 0 {
            debug!(label, skipped, "skipped incomplete SMS/MMS records");
        }
        Ok(ImportBatch::new(messages, skipped))
    }
}

impl Importer for SmsImporter {
    fn name(&self) -> &'static str {
        "SMS Backup"
    }

    fn source(&self) -> Source {
        Source::Sms
    }

    fn can_import(&self, path: &Path) -> bool {
        path.is_file()
            && has_extension(path, "xml")
            && read_head(path, SNIFF_BYTES).is_some_and(|head| head.contains("<smses"))
    }

    fn import(&self, path: &Path, ctx: &ImportContext) -> Result<ImportBatch> {
        let xml = fs::read_to_string(path)?;
        let batch = self
            .parse_str(&xml, &file_label(path), ctx)
            .map_err(|e| match e {
                UnifyError::Parse { format, source, .. } => UnifyError::Parse {
                    format,
                    source,
                    path: Some(path.to_path_buf()),
                },
                other => other,
            })?;
        info!(path = %path.display(), messages = batch.len(), "imported SMS backup");
        Ok(batch)
    }
}
