//! Source importers.
//!
//! Each importer implements [`Importer`](crate::importer::Importer) for one
//! export format:
//!
//! - [`SmsImporter`] - SMS/MMS backup XML
//! - [`SocialImporter`] - social-network `message_N.json`
//! - [`GroupChatImporter`] - groupware chat directories
//! - [`LegacyImporter`] - legacy `conversation_state` JSON
//! - [`MailImporter`] - mbox archives
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "sms")]
//! # fn main() -> chatunify::Result<()> {
//! use chatunify::importer::ImportContext;
//! use chatunify::importers::SmsImporter;
//!
//! let xml = r#"<smses><sms address="+15551234567" date="1700000000000" type="2" body="hi" /></smses>"#;
//! let batch = SmsImporter::new().parse_str(xml, "sms.xml", &ImportContext::new())?;
//! assert_eq!(batch.messages.len(), 1);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sms"))]
//! # fn main() {}
//! ```

#[cfg(feature = "groupchat")]
mod groupchat;
#[cfg(feature = "legacy")]
mod legacy;
#[cfg(feature = "mail")]
mod mail;
#[cfg(feature = "sms")]
mod sms;
#[cfg(feature = "social")]
mod social;

#[cfg(feature = "groupchat")]
pub use groupchat::GroupChatImporter;
#[cfg(feature = "legacy")]
pub use legacy::LegacyImporter;
#[cfg(feature = "mail")]
pub use mail::MailImporter;
#[cfg(feature = "sms")]
pub use sms::SmsImporter;
#[cfg(feature = "social")]
pub use social::SocialImporter;

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Bytes read when sniffing file contents during detection.
pub(crate) const SNIFF_BYTES: u64 = 64 * 1024;

/// Reads up to `limit` bytes from the start of a file, lossily decoded.
pub(crate) fn read_head(path: &Path, limit: u64) -> Option<String> {
    let mut buf = Vec::new();
    File::open(path).ok()?.take(limit).read_to_end(&mut buf).ok()?;
    Some(String::from_utf8_lossy(&buf).into_owned())
}

/// Lowercased final path segment.
pub(crate) fn lower_file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Case-insensitive extension check.
pub(crate) fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
}

/// Finds a direct child of `dir` whose name matches `name` ignoring case.
pub(crate) fn find_child_ci(dir: &Path, name: &str) -> Option<PathBuf> {
    let exact = dir.join(name);
    if exact.exists() {
        return Some(exact);
    }
    fs::read_dir(dir)
        .ok()?
        .flatten()
        .find(|entry| entry.file_name().to_string_lossy().eq_ignore_ascii_case(name))
        .map(|entry| entry.path())
}

/// Resolves a `/`-separated relative path below `dir`, matching every
/// segment case-insensitively.
pub(crate) fn resolve_ci(dir: &Path, relative: &str) -> Option<PathBuf> {
    relative
        .split('/')
        .filter(|s| !s.is_empty())
        .try_fold(dir.to_path_buf(), |current, segment| find_child_ci(&current, segment))
}

/// Display label for a source file, used as a prefix in attachment locators.
pub(crate) fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_ci() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Google Chat").join("GROUPS")).unwrap();

        let found = resolve_ci(dir.path(), "google chat/Groups").unwrap();
        assert!(found.is_dir());
        assert!(found.to_string_lossy().to_lowercase().ends_with("groups"));
        assert!(resolve_ci(dir.path(), "Google Chat/Users").is_none());
    }

    #[test]
    fn test_read_head_limits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "a".repeat(1000)).unwrap();
        assert_eq!(read_head(&path, 10).unwrap().len(), 10);
        assert!(read_head(&dir.path().join("missing"), 10).is_none());
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension(Path::new("backup.XML"), "xml"));
        assert!(!has_extension(Path::new("backup"), "xml"));
        assert_eq!(lower_file_name(Path::new("a/Message_1.JSON")), "message_1.json");
    }
}
