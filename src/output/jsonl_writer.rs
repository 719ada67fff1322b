//! JSON Lines (JSONL) output writer.
//!
//! One message object per line, suited to streaming consumers and
//! line-oriented tools.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::message::Message;

/// Writes messages to a JSONL file.
pub fn write_jsonl(messages: &[Message], path: impl AsRef<Path>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for msg in messages {
        serde_json::to_writer(&mut writer, msg)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Same format as [`write_jsonl`], returned as a string.
pub fn to_jsonl(messages: &[Message]) -> Result<String> {
    let mut out = String::new();
    for msg in messages {
        out.push_str(&serde_json::to_string(msg)?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::Contact;
    use crate::message::MediaAttachment;
    use chrono::{TimeZone, Utc};
    use tempfile::NamedTempFile;

    #[test]
    fn test_one_object_per_line() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let messages = vec![
            Message::new("social", Contact::new("Alice"), Contact::new("Me"), ts).with_body("line\nbreak"),
            Message::new("social", Contact::new("Me"), Contact::new("Alice"), ts)
                .with_attachments(vec![MediaAttachment::new("photos/p.png", "image/png")]),
        ];

        let file = NamedTempFile::new().unwrap();
        write_jsonl(&messages, file.path()).unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap();

        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["attachments"][0]["mimeType"], "image/png");
        assert_eq!(to_jsonl(&messages).unwrap(), content);
    }
}
