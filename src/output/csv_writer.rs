//! CSV output writer.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{Result, UnifyError};
use crate::message::Message;

const HEADER: [&str; 8] = [
    "Timestamp",
    "Source",
    "Direction",
    "From",
    "To",
    "Conversation",
    "Body",
    "Attachments",
];

/// Writes messages to CSV with semicolon delimiter.
///
/// # Format
/// - Delimiter: `;`
/// - Columns: `Timestamp`, `Source`, `Direction`, `From`, `To`,
///   `Conversation`, `Body`, `Attachments`
/// - Contacts are rendered as `Name <address, ...>`
/// - Attachments are their source paths joined with `|`
pub fn write_csv(messages: &[Message], path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path)?;
    write_records(messages, file)
}

/// Same format as [`write_csv`], returned as a string.
pub fn to_csv(messages: &[Message]) -> Result<String> {
    let mut buf = Vec::new();
    write_records(messages, &mut buf)?;
    String::from_utf8(buf)
        .map_err(|e| UnifyError::invalid_format("csv", format!("non UTF-8 output: {e}")))
}

fn write_records<W: Write>(messages: &[Message], out: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(out);
    writer.write_record(HEADER)?;
    for msg in messages {
        writer.write_record(build_record(msg))?;
    }
    writer.flush()?;
    Ok(())
}

fn build_record(msg: &Message) -> [String; 8] {
    [
        msg.timestamp_utc().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        msg.source_application().to_string(),
        msg.direction().to_string(),
        msg.from().to_string(),
        msg.to().to_string(),
        msg.conversation().unwrap_or_default().to_string(),
        msg.body().to_string(),
        msg.attachments()
            .iter()
            .map(|a| a.original_source_path.as_str())
            .collect::<Vec<_>>()
            .join("|"),
    ]
}
