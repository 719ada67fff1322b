//! Writers for the unified message model.
//!
//! - [`write_json`] / [`to_json`] - pretty JSON array of messages
//! - [`write_jsonl`] / [`to_jsonl`] - one message per line
//! - [`write_csv`] / [`to_csv`] - flat semicolon-delimited table (requires `csv-output`)
//!
//! JSON and JSONL serialize [`Message`] as-is (camelCase fields, contacts as
//! objects). CSV flattens contacts to their display form.
//!
//! # Example
//!
//! ```rust
//! use chatunify::output::{OutputFormat, to_format_string};
//! use chatunify::{Contact, Message};
//! use chrono::{TimeZone, Utc};
//!
//! # fn main() -> chatunify::Result<()> {
//! let ts = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
//! let messages = vec![Message::new("social", Contact::new("Alice"), Contact::new("Me"), ts).with_body("hi")];
//!
//! let jsonl = to_format_string(&messages, OutputFormat::Jsonl)?;
//! assert_eq!(jsonl.lines().count(), 1);
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "csv-output")]
mod csv_writer;
mod json_writer;
mod jsonl_writer;

#[cfg(feature = "csv-output")]
pub use csv_writer::{to_csv, write_csv};
pub use json_writer::{to_json, write_json};
pub use jsonl_writer::{to_jsonl, write_jsonl};

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UnifyError};
use crate::message::Message;

/// Output format for the unified corpus.
///
/// ```rust
/// use chatunify::output::OutputFormat;
/// use std::str::FromStr;
///
/// let format = OutputFormat::from_str("ndjson").unwrap();
/// assert_eq!(format, OutputFormat::Jsonl);
/// assert_eq!(format.extension(), "jsonl");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum OutputFormat {
    /// JSON array of messages
    #[default]
    Json,

    /// JSON Lines, one message object per line
    Jsonl,

    /// Semicolon-delimited table, one row per message
    Csv,
}

impl OutputFormat {
    /// File extension for this format (without dot).
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Jsonl => "jsonl",
            OutputFormat::Csv => "csv",
        }
    }

    /// Returns all supported format names.
    pub fn all_names() -> &'static [&'static str] {
        &["json", "jsonl", "ndjson", "csv"]
    }

    /// Detects the format from a file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let ext = path
            .as_ref()
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        ext.parse().map_err(|_| {
            UnifyError::invalid_format(
                "output",
                format!("Unknown file extension: '.{ext}'. Expected one of: json, jsonl, csv"),
            )
        })
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "JSON"),
            OutputFormat::Jsonl => write!(f, "JSONL"),
            OutputFormat::Csv => write!(f, "CSV"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "ndjson" => Ok(OutputFormat::Jsonl),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!(
                "Unknown format: '{}'. Expected one of: {}",
                s,
                OutputFormat::all_names().join(", ")
            )),
        }
    }
}

#[cfg(not(feature = "csv-output"))]
fn csv_disabled() -> UnifyError {
    UnifyError::invalid_format(
        "output",
        "CSV output requires the 'csv-output' feature to be enabled",
    )
}

/// Writes `messages` to `path` in `format`.
pub fn write_to_format(
    messages: &[Message],
    path: impl AsRef<Path>,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => write_json(messages, path),
        OutputFormat::Jsonl => write_jsonl(messages, path),
        #[cfg(feature = "csv-output")]
        OutputFormat::Csv => write_csv(messages, path),
        #[cfg(not(feature = "csv-output"))]
        OutputFormat::Csv => Err(csv_disabled()),
    }
}

/// Renders `messages` as a string in `format`.
pub fn to_format_string(messages: &[Message], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(messages),
        OutputFormat::Jsonl => to_jsonl(messages),
        #[cfg(feature = "csv-output")]
        OutputFormat::Csv => to_csv(messages),
        #[cfg(not(feature = "csv-output"))]
        OutputFormat::Csv => Err(csv_disabled()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("ndjson").unwrap(), OutputFormat::Jsonl);
        assert_eq!(OutputFormat::from_str("csv").unwrap(), OutputFormat::Csv);
        assert!(OutputFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(OutputFormat::from_path("out/all.JSONL").unwrap(), OutputFormat::Jsonl);
        assert_eq!(OutputFormat::from_path("a.csv").unwrap(), OutputFormat::Csv);
        assert!(OutputFormat::from_path("a.txt").unwrap_err().is_invalid_format());
        assert!(OutputFormat::from_path("noext").is_err());
    }

    #[test]
    fn test_format_default_and_serde() {
        assert_eq!(OutputFormat::default(), OutputFormat::Json);
        assert_eq!(serde_json::to_string(&OutputFormat::Jsonl).unwrap(), "\"jsonl\"");
    }
}
