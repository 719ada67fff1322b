//! Source auto-detection and corpus import.
//!
//! [`ImporterRegistry::scan`] walks a root directory once and asks every
//! registered [`Importer`] whether it understands each entry.
//! [`ImporterRegistry::import`] then runs the matching importers; a source
//! that fails is recorded as a [`SourceFailure`] and the rest continue.
//!
//! # Example
//!
//! ```rust,no_run
//! use chatunify::importer::ImportContext;
//! use chatunify::registry::{CorpusStatus, ImporterRegistry};
//!
//! # fn main() -> chatunify::Result<()> {
//! let registry = ImporterRegistry::new();
//! let outcome = registry.import_root("exports/".as_ref(), &ImportContext::new())?;
//! match outcome.status() {
//!     CorpusStatus::NothingDetected => println!("no exports found"),
//!     CorpusStatus::AllFailed => println!("every source failed"),
//!     _ => println!("{} messages", outcome.messages.len()),
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::ScanConfig;
use crate::error::{Result, UnifyError};
use crate::importer::{ImportBatch, ImportContext, Importer, Source, all_importers};
use crate::message::Message;

/// A source path some importer claimed during [`ImporterRegistry::scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub source: Source,
    pub path: PathBuf,
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.path.display())
    }
}

/// A detected source whose import failed as a whole.
#[derive(Debug)]
pub struct SourceFailure {
    pub detection: Detection,
    pub error: UnifyError,
}

/// Per-source result of a successful import.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub detection: Detection,
    pub messages: usize,
    pub skipped: usize,
    pub local_identity: Option<String>,
}

/// Corpus-level result, distinguishing "found nothing" from "found
/// sources that all failed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusStatus {
    /// No importer matched anything under the root.
    NothingDetected,
    /// Sources were detected but every one failed to import.
    AllFailed,
    /// Every detected source imported.
    Imported,
    /// Some sources imported, others failed.
    PartiallyImported,
}

/// Everything produced by importing a set of detections.
#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub detections: Vec<Detection>,
    /// Messages from every successful source, concatenated in detection order.
    pub messages: Vec<Message>,
    pub reports: Vec<SourceReport>,
    pub failures: Vec<SourceFailure>,
}

impl ImportOutcome {
    pub fn status(&self) -> CorpusStatus {
        if self.detections.is_empty() {
            CorpusStatus::NothingDetected
        } else if self.failures.len() >= self.detections.len() {
            CorpusStatus::AllFailed
        } else if self.failures.is_empty() {
            CorpusStatus::Imported
        } else {
            CorpusStatus::PartiallyImported
        }
    }

    /// Total records skipped across successful sources.
    pub fn skipped(&self) -> usize {
        self.reports.iter().map(|r| r.skipped).sum()
    }
}

/// Holds the importers to dispatch to and the traversal settings.
pub struct ImporterRegistry {
    importers: Vec<Box<dyn Importer>>,
    scan: ScanConfig,
}

impl fmt::Debug for ImporterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImporterRegistry")
            .field(
                "importers",
                &self.importers.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .field("scan", &self.scan)
            .finish()
    }
}

impl Default for ImporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ImporterRegistry {
    /// Registry with every importer whose feature is enabled.
    pub fn new() -> Self {
        Self::with_importers(all_importers())
    }

    pub fn with_importers(importers: Vec<Box<dyn Importer>>) -> Self {
        Self {
            importers,
            scan: ScanConfig::default(),
        }
    }

    #[must_use]
    pub fn with_scan_config(mut self, scan: ScanConfig) -> Self {
        self.scan = scan;
        self
    }

    /// Keeps only importers for the listed sources.
    #[must_use]
    pub fn only(mut self, sources: &[Source]) -> Self {
        self.importers.retain(|i| sources.contains(&i.source()));
        self
    }

    pub fn importers(&self) -> impl Iterator<Item = &dyn Importer> {
        self.importers.iter().map(|i| i.as_ref())
    }

    fn importer_for(&self, source: Source) -> Option<&dyn Importer> {
        self.importers().find(|i| i.source() == source)
    }

    /// Finds every `(source, path)` pair under `root`.
    ///
    /// Entries are visited parents first in name order. Once a path is
    /// claimed by a source, its descendants are not offered to that source
    /// again; other sources still see them.
    ///
    /// # Errors
    ///
    /// Returns an IO error if `root` does not exist and a traversal error if
    /// it cannot be read. Unreadable entries below the root are logged and
    /// skipped.
    pub fn scan(&self, root: &Path) -> Result<Vec<Detection>> {
        if !root.exists() {
            return Err(UnifyError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", root.display()),
            )));
        }

        let walker = WalkDir::new(root)
            .follow_links(self.scan.follow_links)
            .max_depth(self.scan.max_depth)
            .sort_by_file_name();

        let mut detections: Vec<Detection> = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let path = entry.path();
            for importer in &self.importers {
                let source = importer.source();
                let claimed = detections
                    .iter()
                    .any(|d| d.source == source && path.starts_with(&d.path));
                if claimed || !importer.can_import(path) {
                    continue;
                }
                debug!(source = %source, path = %path.display(), "detected source");
                detections.push(Detection {
                    source,
                    path: path.to_path_buf(),
                });
            }
        }

        info!(root = %root.display(), sources = detections.len(), "scan complete");
        Ok(detections)
    }

    fn import_one(&self, detection: &Detection, ctx: &ImportContext) -> Result<ImportBatch> {
        let importer = self.importer_for(detection.source).ok_or_else(|| {
            UnifyError::invalid_format("registry", format!("no importer for {}", detection.source))
        })?;
        importer.import(&detection.path, ctx)
    }

    /// Imports `detections`, continuing past failed sources.
    ///
    /// With [`ScanConfig::parallel`] set, each detection runs on its own
    /// scoped thread; output order is still detection order.
    pub fn import(&self, detections: Vec<Detection>, ctx: &ImportContext) -> ImportOutcome {
        let results: Vec<Result<ImportBatch>> = if self.scan.parallel && detections.len() > 1 {
            std::thread::scope(|s| {
                let handles: Vec<_> = detections
                    .iter()
                    .map(|d| s.spawn(move || self.import_one(d, ctx)))
                    .collect();
                handles
                    .into_iter()
                    .map(|h| {
                        h.join().unwrap_or_else(|_| {
                            Err(UnifyError::invalid_format("registry", "importer thread panicked"))
                        })
                    })
                    .collect()
            })
        } else {
            detections.iter().map(|d| self.import_one(d, ctx)).collect()
        };

        let mut outcome = ImportOutcome::default();
        for (detection, result) in detections.iter().zip(results) {
            match result {
                Ok(batch) => {
                    outcome.reports.push(SourceReport {
                        detection: detection.clone(),
                        messages: batch.messages.len(),
                        skipped: batch.skipped,
                        local_identity: batch.local_identity,
                    });
                    outcome.messages.extend(batch.messages);
                }
                Err(error) => {
                    warn!(
                        source = %detection.source,
                        path = %detection.path.display(),
                        error = %error,
                        "source failed to import, continuing"
                    );
                    outcome.failures.push(SourceFailure {
                        detection: detection.clone(),
                        error,
                    });
                }
            }
        }
        outcome.detections = detections;

        match outcome.status() {
            CorpusStatus::NothingDetected => warn!("no importable sources detected"),
            CorpusStatus::AllFailed => warn!(
                sources = outcome.detections.len(),
                "every detected source failed to import"
            ),
            _ => info!(
                messages = outcome.messages.len(),
                sources = outcome.reports.len(),
                failed = outcome.failures.len(),
                "import complete"
            ),
        }
        outcome
    }

    /// [`scan`](Self::scan) followed by [`import`](Self::import).
    ///
    /// # Errors
    ///
    /// Only fails if `root` itself cannot be scanned.
    pub fn import_root(&self, root: &Path, ctx: &ImportContext) -> Result<ImportOutcome> {
        let detections = self.scan(root)?;
        Ok(self.import(detections, ctx))
    }
}
