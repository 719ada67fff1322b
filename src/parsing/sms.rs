//! SMS/MMS backup XML records.
//!
//! The backup is a flat `<smses>` document:
//!
//! ```xml
//! <smses count="2">
//!   <sms address="+15551234567" date="1700000000000" type="2" body="hi" contact_name="Bob" />
//!   <mms date="1700000000" msg_box="1" address="+15557654321">
//!     <parts>
//!       <part ct="application/smil" ... />
//!       <part ct="image/jpeg" name="photo.jpg" data="..." />
//!     </parts>
//!     <addrs><addr address="+15557654321" type="137" /></addrs>
//!   </mms>
//! </smses>
//! ```
//!
//! `sms@date` is milliseconds, `mms@date` is seconds.

use std::borrow::Cow;
use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use tracing::warn;

use crate::config::SmsConfig;
use crate::contact::Contact;
use crate::message::{Direction, MediaAttachment, Message};
use crate::timestamp::{EpochUnit, parse_epoch_str};

/// `addr@type` for the sender of an MMS.
const MMS_ADDR_FROM: &str = "137";
/// `addr@type` for a direct recipient of an MMS.
const MMS_ADDR_TO: &str = "151";

/// Attribute map of one element, keys lowercased.
pub type Attrs = HashMap<String, String>;

/// One `<part>` of an MMS.
#[derive(Debug, Clone, Default)]
pub struct RawPart {
    pub content_type: String,
    pub text: Option<String>,
    pub name: Option<String>,
}

/// One `<mms>` element with its children.
#[derive(Debug, Clone, Default)]
pub struct RawMms {
    pub attrs: Attrs,
    pub parts: Vec<RawPart>,
    /// `(address, type)` pairs from `<addr>` children.
    pub addrs: Vec<(String, String)>,
}

/// A record read from the backup, before mapping.
#[derive(Debug, Clone)]
pub enum RawRecord {
    Sms(Attrs),
    Mms(RawMms),
}

/// Parses a numeric character reference at the start of `s`, returning
/// its code point and length.
fn char_ref_at(s: &str) -> Option<(u32, usize)> {
    let rest = s.strip_prefix("&#")?;
    let end = rest.find(';')?;
    let digits = &rest[..end];
    let value = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    Some((value, end + 3))
}

/// Folds UTF-16 surrogate references such as `&#55357;&#56832;` into the
/// character they encode. Backups write astral-plane characters (emoji)
/// this way, and XML forbids surrogate code points. Unpaired surrogates
/// become U+FFFD.
pub fn decode_surrogate_refs(raw: &str) -> Cow<'_, str> {
    if !raw.contains("&#") {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find("&#") {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match char_ref_at(rest) {
            Some((unit, len)) if (0xD800..=0xDFFF).contains(&unit) => {
                let mut units = vec![unit as u16];
                let mut consumed = len;
                if unit < 0xDC00 {
                    if let Some((low, low_len)) = char_ref_at(&rest[len..])
                        .filter(|&(low, _)| (0xDC00..=0xDFFF).contains(&low))
                    {
                        units.push(low as u16);
                        consumed += low_len;
                    }
                }
                out.extend(
                    char::decode_utf16(units).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)),
                );
                rest = &rest[consumed..];
            }
            _ => {
                out.push_str("&#");
                rest = &rest[2..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn attrs_of(e: &BytesStart<'_>) -> Attrs {
    e.attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_lowercase();
            let raw = String::from_utf8_lossy(&attr.value);
            let decoded = decode_surrogate_refs(&raw);
            let value = match unescape(&decoded) {
                Ok(value) => value.into_owned(),
                Err(err) => {
                    warn!(attribute = %key, error = %err, "keeping attribute value unescaped");
                    decoded.to_string()
                }
            };
            (key, value)
        })
        .collect()
}

fn is_tag(e: &BytesStart<'_>, tag: &[u8]) -> bool {
    e.name().as_ref().eq_ignore_ascii_case(tag)
}

/// Reads every `<sms>` and `<mms>` record in document order.
///
/// # Errors
///
/// Returns the reader error if the document is not well-formed XML.
pub fn read_records(xml: &str) -> Result<Vec<RawRecord>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut records = Vec::new();
    let mut current_mms: Option<RawMms> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if is_tag(&e, b"mms") => {
                current_mms = Some(RawMms {
                    attrs: attrs_of(&e),
                    ..RawMms::default()
                });
            }
            Event::Empty(e) if is_tag(&e, b"mms") => {
                records.push(RawRecord::Mms(RawMms {
                    attrs: attrs_of(&e),
                    ..RawMms::default()
                }));
            }
            Event::End(e) if e.name().as_ref().eq_ignore_ascii_case(b"mms") => {
                if let Some(mms) = current_mms.take() {
                    records.push(RawRecord::Mms(mms));
                }
            }
            Event::Start(e) | Event::Empty(e) if is_tag(&e, b"sms") => {
                records.push(RawRecord::Sms(attrs_of(&e)));
            }
            Event::Start(e) | Event::Empty(e) if is_tag(&e, b"part") => {
                if let Some(mms) = current_mms.as_mut() {
                    let mut attrs = attrs_of(&e);
                    mms.parts.push(RawPart {
                        content_type: attrs.remove("ct").unwrap_or_default(),
                        text: attrs.remove("text").filter(|t| t != "null"),
                        name: attrs
                            .remove("name")
                            .or_else(|| attrs.remove("cl"))
                            .filter(|n| !n.is_empty() && n != "null"),
                    });
                }
            }
            Event::Start(e) | Event::Empty(e) if is_tag(&e, b"addr") => {
                if let Some(mms) = current_mms.as_mut() {
                    let mut attrs = attrs_of(&e);
                    if let Some(address) = attrs.remove("address") {
                        mms.addrs
                            .push((address, attrs.remove("type").unwrap_or_default()));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(records)
}

/// Per-file inputs for mapping records.
#[derive(Debug, Clone, Copy)]
pub struct SmsMapping<'a> {
    pub config: &'a SmsConfig,
    pub self_contact: &'a Contact,
    /// Prefix for MMS attachment locators (usually the backup file name).
    pub file_label: &'a str,
    pub source_tag: &'a str,
}

fn counterparty(address: &str, contact_name: Option<&str>, config: &SmsConfig) -> Contact {
    let contact = Contact::from_address(address);
    match contact_name {
        Some(name) if !config.is_unknown_name(name) => {
            let named = contact
                .phone_numbers()
                .iter()
                .fold(Contact::new(name), |c, p| c.with_phone(p));
            contact.emails().iter().fold(named, |c, e| c.with_email(e))
        }
        _ => contact,
    }
}

fn sms_direction(code: Option<&str>) -> Direction {
    match code.map(str::trim) {
        Some("1") => Direction::Received,
        Some("2") => Direction::Sent,
        _ => Direction::Unknown,
    }
}

/// Maps one `<sms>` element. Returns `None` for records missing an
/// address or a readable date.
pub fn map_sms(attrs: &Attrs, m: &SmsMapping<'_>) -> Option<Message> {
    let address = attrs.get("address").map(|a| a.trim()).filter(|a| !a.is_empty())?;
    let timestamp = parse_epoch_str(attrs.get("date")?, EpochUnit::Millis)?;
    let direction = sms_direction(attrs.get("type").map(String::as_str));
    let other = counterparty(address, attrs.get("contact_name").map(String::as_str), m.config);
    let body = attrs.get("body").filter(|b| *b != "null").cloned().unwrap_or_default();

    let (from, to) = match direction {
        Direction::Sent => (m.self_contact.clone(), other),
        _ => (other, m.self_contact.clone()),
    };

    let message = Message::new(m.source_tag, from, to, timestamp)
        .with_body(body)
        .with_direction(direction)
        .with_conversation(address);

    (!message.is_empty()).then_some(message)
}

fn pick_address<'a>(mms: &'a RawMms, preferred: &str) -> Option<&'a str> {
    let usable = |a: &&(String, String)| {
        let addr = a.0.trim();
        !addr.is_empty() && !addr.eq_ignore_ascii_case("insert-address-token")
    };
    mms.addrs
        .iter()
        .filter(usable)
        .find(|(_, t)| t == preferred)
        .or_else(|| mms.addrs.iter().find(usable))
        .map(|(a, _)| a.as_str())
        .or_else(|| mms.attrs.get("address").map(String::as_str))
        .map(str::trim)
        .filter(|a| !a.is_empty())
}

/// Maps one `<mms>` element.
///
/// Text parts are joined into the body in document order, SMIL layout
/// parts are dropped, and every other part becomes an attachment located at
/// `{file_label}/mms-{index}/{name}`.
pub fn map_mms(mms: &RawMms, index: usize, m: &SmsMapping<'_>) -> Option<Message> {
    let timestamp = parse_epoch_str(mms.attrs.get("date")?, EpochUnit::Seconds)?;
    let direction = sms_direction(mms.attrs.get("msg_box").map(String::as_str));
    let preferred = if direction == Direction::Sent {
        MMS_ADDR_TO
    } else {
        MMS_ADDR_FROM
    };
    let address = pick_address(mms, preferred)?;
    let other = counterparty(
        address,
        mms.attrs.get("contact_name").map(String::as_str),
        m.config,
    );

    let mut texts = Vec::new();
    let mut attachments = Vec::new();
    for (part_idx, part) in mms.parts.iter().enumerate() {
        let ct = part.content_type.trim().to_ascii_lowercase();
        if ct.starts_with("application/smil") {
            continue;
        }
        if ct.starts_with("text/") {
            if let Some(text) = part.text.as_deref().filter(|t| !t.is_empty()) {
                texts.push(text);
            }
            continue;
        }
        let name = part
            .name
            .clone()
            .unwrap_or_else(|| format!("part-{part_idx}"));
        let mime = if ct.is_empty() {
            "application/octet-stream".to_string()
        } else {
            ct
        };
        attachments.push(MediaAttachment::new(
            format!("{}/mms-{}/{}", m.file_label, index, name),
            mime,
        ));
    }

    let (from, to) = match direction {
        Direction::Sent => (m.self_contact.clone(), other),
        _ => (other, m.self_contact.clone()),
    };

    let message = Message::new(m.source_tag, from, to, timestamp)
        .with_body(texts.join("\n"))
        .with_direction(direction)
        .with_attachments(attachments)
        .with_conversation(address);

    (!message.is_empty()).then_some(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping<'a>(config: &'a SmsConfig, me: &'a Contact) -> SmsMapping<'a> {
        SmsMapping {
            config,
            self_contact: me,
            file_label: "sms.xml",
            source_tag: "sms-backup",
        }
    }

    #[test]
    fn test_read_records_mixed() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <smses count="2">
              <sms address="+1555" date="1700000000000" type="1" body="a &amp; b" />
              <mms date="1700000000" msg_box="2">
                <parts><part ct="text/plain" text="hey" /></parts>
                <addrs><addr address="+1666" type="151" /></addrs>
              </mms>
            </smses>"#;
        let records = read_records(xml).unwrap();
        assert_eq!(records.len(), 2);
        match &records[0] {
            RawRecord::Sms(attrs) => assert_eq!(attrs["body"], "a & b"),
            RawRecord::Mms(_) => panic!("expected sms"),
        }
        match &records[1] {
            RawRecord::Mms(mms) => {
                assert_eq!(mms.parts.len(), 1);
                assert_eq!(mms.addrs, vec![("+1666".to_string(), "151".to_string())]);
            }
            RawRecord::Sms(_) => panic!("expected mms"),
        }
    }

    #[test]
    fn test_read_records_emoji_surrogates() {
        let xml = r#"<smses>
              <sms address="+1555" date="1700000000000" type="1" body="hi &#55357;&#56832;" />
              <sms address="+1555" date="1700000000000" type="1" body="hex &#xD83D;&#xDE00; &amp; &#65;" />
            </smses>"#;
        let records = read_records(xml).unwrap();
        let bodies: Vec<&str> = records
            .iter()
            .map(|r| match r {
                RawRecord::Sms(attrs) => attrs["body"].as_str(),
                RawRecord::Mms(_) => panic!("expected sms"),
            })
            .collect();
        assert_eq!(bodies, vec!["hi 😀", "hex 😀 & A"]);
    }

    #[test]
    fn test_decode_surrogate_refs() {
        assert_eq!(decode_surrogate_refs("plain"), "plain");
        assert_eq!(decode_surrogate_refs("&#55357;&#56832;!"), "😀!");
        assert_eq!(decode_surrogate_refs("lone &#55357; x"), "lone \u{FFFD} x");
        assert_eq!(decode_surrogate_refs("keep &#65; &amp;"), "keep &#65; &amp;");
    }

    #[test]
    fn test_bad_entity_keeps_raw_value() {
        let records = read_records(r#"<smses><sms address="1" body="AT&T" /></smses>"#).unwrap();
        match &records[0] {
            RawRecord::Sms(attrs) => assert_eq!(attrs["body"], "AT&T"),
            RawRecord::Mms(_) => panic!("expected sms"),
        }
    }

    #[test]
    fn test_read_records_malformed() {
        assert!(read_records("<smses><sms address=\"1\" date=\"2\"></smses>").is_err());
    }

    #[test]
    fn test_map_sms_sent() {
        let config = SmsConfig::default();
        let me = Contact::new("Me");
        let attrs: Attrs = [
            ("address", "+15551234567"),
            ("date", "1700000000000"),
            ("type", "2"),
            ("body", "hi"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let msg = map_sms(&attrs, &mapping(&config, &me)).unwrap();
        assert_eq!(msg.direction(), Direction::Sent);
        assert_eq!(msg.body(), "hi");
        assert_eq!(msg.from(), &me);
        assert!(msg.to().phone_numbers().contains("+15551234567"));
        assert_eq!(msg.timestamp_utc().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_map_sms_contact_name_fallback() {
        let config = SmsConfig::default();
        let me = Contact::new("Me");
        let mut attrs: Attrs = [("address", "555-0100"), ("date", "1"), ("type", "1"), ("body", "x")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        attrs.insert("contact_name".into(), "(Unknown)".into());
        let msg = map_sms(&attrs, &mapping(&config, &me)).unwrap();
        assert_eq!(msg.from().name(), "555-0100");

        attrs.insert("contact_name".into(), "Bob".into());
        let msg = map_sms(&attrs, &mapping(&config, &me)).unwrap();
        assert_eq!(msg.from().name(), "Bob");
        assert!(msg.from().phone_numbers().contains("5550100"));
        assert_eq!(msg.direction(), Direction::Received);
    }

    #[test]
    fn test_map_sms_skips_incomplete() {
        let config = SmsConfig::default();
        let me = Contact::new("Me");
        let no_date: Attrs = [("address".to_string(), "1".to_string())].into_iter().collect();
        assert!(map_sms(&no_date, &mapping(&config, &me)).is_none());

        let no_address: Attrs = [("date".to_string(), "1".to_string())].into_iter().collect();
        assert!(map_sms(&no_address, &mapping(&config, &me)).is_none());
    }

    #[test]
    fn test_map_sms_unknown_type() {
        let config = SmsConfig::default();
        let me = Contact::new("Me");
        let attrs: Attrs = [("address", "1"), ("date", "1"), ("type", "3"), ("body", "draft")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let msg = map_sms(&attrs, &mapping(&config, &me)).unwrap();
        assert_eq!(msg.direction(), Direction::Unknown);
    }

    #[test]
    fn test_map_mms_parts() {
        let config = SmsConfig::default();
        let me = Contact::new("Me");
        let mms = RawMms {
            attrs: [("date", "1700000000"), ("msg_box", "1")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            parts: vec![
                RawPart {
                    content_type: "application/smil".into(),
                    text: Some("<smil/>".into()),
                    name: None,
                },
                RawPart {
                    content_type: "text/plain".into(),
                    text: Some("one".into()),
                    name: None,
                },
                RawPart {
                    content_type: "image/jpeg".into(),
                    text: None,
                    name: Some("photo.jpg".into()),
                },
                RawPart {
                    content_type: "text/plain".into(),
                    text: Some("two".into()),
                    name: None,
                },
            ],
            addrs: vec![
                ("+1999".into(), "151".into()),
                ("+1888".into(), "137".into()),
            ],
        };

        let msg = map_mms(&mms, 4, &mapping(&config, &me)).unwrap();
        assert_eq!(msg.direction(), Direction::Received);
        assert_eq!(msg.body(), "one\ntwo");
        assert_eq!(msg.attachments().len(), 1);
        assert_eq!(msg.attachments()[0].original_source_path, "sms.xml/mms-4/photo.jpg");
        assert_eq!(msg.attachments()[0].file_name(), "photo.jpg");
        assert!(msg.from().phone_numbers().contains("+1888"));
        assert_eq!(msg.timestamp_utc().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_map_mms_without_address_is_skipped() {
        let config = SmsConfig::default();
        let me = Contact::new("Me");
        let mms = RawMms {
            attrs: [("date".to_string(), "1700000000".to_string())].into_iter().collect(),
            parts: vec![],
            addrs: vec![("insert-address-token".into(), "137".into())],
        };
        assert!(map_mms(&mms, 0, &mapping(&config, &me)).is_none());
    }
}
