//! JSON output writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::message::Message;

/// Writes messages to a file as a pretty-printed JSON array.
///
/// # Format
/// ```json
/// [
///   {
///     "sourceApplication": "sms-backup",
///     "from": {"name": "Me", "phoneNumbers": [], "emails": []},
///     "to": {"name": "+15551234567", "phoneNumbers": ["+15551234567"], "emails": []},
///     "timestampUtc": "2023-11-14T22:13:20Z",
///     "body": "hi",
///     "direction": "sent"
///   }
/// ]
/// ```
pub fn write_json(messages: &[Message], path: impl AsRef<Path>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, messages)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Same format as [`write_json`], returned as a string.
pub fn to_json(messages: &[Message]) -> Result<String> {
    Ok(serde_json::to_string_pretty(messages)?)
}
