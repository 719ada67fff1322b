//! Edge case tests for chatunify
//!
//! These tests cover boundary conditions of the source formats that the
//! per-module unit tests and the end-to-end scenarios do not reach.

use std::fs;

use chatunify::config::{Config, MergeConfig, SocialConfig};
use chatunify::importer::{ImportContext, Importer, Source};
use chatunify::importers::{GroupChatImporter, LegacyImporter, MailImporter, SmsImporter, SocialImporter};
use chatunify::merge::{DecisionLog, find_candidates, name_similarity};
use chatunify::output::{OutputFormat, to_format_string};
use chatunify::registry::{CorpusStatus, ImporterRegistry};
use chatunify::{Contact, Direction};
use chrono::{TimeZone, Utc};
use tempfile::tempdir;

// =========================================================================
// Encoding and unicode
// =========================================================================

const MOJIBAKE_EXPORT: &str = r#"{
    "participants": [{"name": "RenÃ©e"}, {"name": "Me"}],
    "title": "RenÃ©e",
    "messages": [
        {"sender_name": "RenÃ©e", "timestamp_ms": 1700000000000, "content": "cafÃ© ð\u009f\u0098\u0080"}
    ]
}"#;

#[test]
fn test_social_mojibake_is_repaired() {
    let batch = SocialImporter::new()
        .parse_str(MOJIBAKE_EXPORT, &ImportContext::new())
        .unwrap();
    let msg = &batch.messages[0];
    assert_eq!(msg.from().name(), "Renée");
    assert_eq!(msg.body(), "café 😀");
    assert_eq!(msg.conversation(), Some("Renée"));
}

#[test]
fn test_social_mojibake_repair_can_be_disabled() {
    let config = Config::default().with_social(SocialConfig::new().with_fix_encoding(false));
    let ctx = ImportContext::new().with_config(config);
    let batch = SocialImporter::new().parse_str(MOJIBAKE_EXPORT, &ctx).unwrap();
    assert_eq!(batch.messages[0].from().name(), "Ren\u{00c3}\u{00a9}e");
}

#[test]
fn test_unicode_names_match_by_token_prefix() {
    let config = MergeConfig::default();
    assert!(name_similarity("Иван Петров", "иван петр", &config).is_some());
    assert!(name_similarity("Иван Петров", "Мария Петрова", &config).is_none());
    assert!(name_similarity("田中太郎", "田中太郎", &config).is_some());
}

// =========================================================================
// SMS / MMS
// =========================================================================

#[test]
fn test_sms_null_body_without_attachments_is_skipped() {
    let xml = r#"<smses>
        <sms address="+15551234567" date="1700000000000" type="1" body="null" />
        <sms address="+15551234567" date="1700000001000" type="1" body="real" />
    </smses>"#;
    let batch = SmsImporter::new()
        .parse_str(xml, "sms.xml", &ImportContext::new())
        .unwrap();
    assert_eq!(batch.messages.len(), 1);
    assert_eq!(batch.messages[0].body(), "real");
}

#[test]
fn test_sms_emoji_surrogate_pair_body() {
    let xml = r#"<smses><sms address="+15551234567" date="1700000000000" type="1" body="hi &#55357;&#56832;" /></smses>"#;
    let batch = SmsImporter::new()
        .parse_str(xml, "sms.xml", &ImportContext::new())
        .unwrap();
    assert_eq!(batch.messages.len(), 1);
    assert_eq!(batch.skipped, 0);
    assert_eq!(batch.messages[0].body(), "hi 😀");
}

#[test]
fn test_sms_unknown_type_has_unknown_direction() {
    let xml = r#"<smses><sms address="+15551234567" date="1700000000000" type="3" body="draft" /></smses>"#;
    let batch = SmsImporter::new()
        .parse_str(xml, "sms.xml", &ImportContext::new())
        .unwrap();
    assert_eq!(batch.messages[0].direction(), Direction::Unknown);
}

#[test]
fn test_mms_text_part_becomes_body() {
    let xml = r#"<smses>
      <mms date="1700000000" msg_box="2" address="+15557654321">
        <parts>
          <part seq="-1" ct="application/smil" name="null" text="&lt;smil/&gt;" />
          <part seq="0" ct="text/plain" name="null" text="caption" />
          <part seq="1" ct="image/png" name="cat.png" data="iVBOR" />
        </parts>
        <addrs><addr address="+15557654321" type="151" charset="106" /></addrs>
      </mms>
    </smses>"#;
    let batch = SmsImporter::new()
        .parse_str(xml, "sms.xml", &ImportContext::new())
        .unwrap();
    let mms = &batch.messages[0];
    assert_eq!(mms.direction(), Direction::Sent);
    assert_eq!(mms.body(), "caption");
    assert_eq!(mms.attachments().len(), 1);
    assert_eq!(mms.attachments()[0].mime_type, "image/png");
    assert_eq!(
        mms.timestamp_utc(),
        Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap()
    );
}

#[test]
fn test_sms_empty_backup() {
    let batch = SmsImporter::new()
        .parse_str("<smses count=\"0\"></smses>", "sms.xml", &ImportContext::new())
        .unwrap();
    assert!(batch.is_empty());
    assert_eq!(batch.skipped, 0);
}

// =========================================================================
// Group chat
// =========================================================================

#[test]
fn test_groupchat_date_strings() {
    let messages = r#"{"messages": [
        {"creator": {"name": "A", "email": "a@x.com"}, "created_date": "Monday, January 15, 2024 at 10:30:00 AM UTC", "text": "spelled out"},
        {"creator": {"name": "A", "email": "a@x.com"}, "created_date": "1705314600000", "text": "numeric string"}
    ]}"#;
    let batch = GroupChatImporter::new()
        .parse_conversations(&[("Space", messages, None)], &ImportContext::new())
        .unwrap();
    let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
    assert_eq!(batch.messages.len(), 2);
    assert!(batch.messages.iter().all(|m| m.timestamp_utc() == expected));
}

#[test]
fn test_groupchat_single_identity_resolves() {
    let messages = r#"[{"creator": {"name": "A", "email": "a@x.com"}, "created_date": 1700000000, "text": "alone"}]"#;
    let batch = GroupChatImporter::new()
        .parse_conversations(&[("Notes", messages, None)], &ImportContext::new())
        .unwrap();
    assert_eq!(batch.local_identity.as_deref(), Some("a@x.com"));
    assert_eq!(batch.messages[0].direction(), Direction::Sent);
}

#[test]
fn test_groupchat_no_emails_is_unknown() {
    let messages = r#"[
        {"creator": {"name": "A"}, "created_date": 1700000000, "text": "one"},
        {"creator": {"name": "B"}, "created_date": 1700000001, "text": "two"}
    ]"#;
    let batch = GroupChatImporter::new()
        .parse_conversations(&[("Space", messages, None)], &ImportContext::new())
        .unwrap();
    assert!(batch.local_identity.is_none());
    assert!(batch.messages.iter().all(|m| m.direction() == Direction::Unknown));
}

#[test]
fn test_groupchat_layout_names_are_case_insensitive() {
    let dir = tempdir().unwrap();
    let conv = dir.path().join("GROUPS").join("Space A");
    fs::create_dir_all(&conv).unwrap();
    fs::write(
        conv.join("MESSAGES.JSON"),
        r#"[{"creator": {"name": "A", "email": "a@x.com"}, "created_date": 1700000000, "text": "hi"}]"#,
    )
    .unwrap();

    let importer = GroupChatImporter::new();
    assert!(importer.can_import(dir.path()));
    let batch = importer.import(dir.path(), &ImportContext::new()).unwrap();
    assert_eq!(batch.messages.len(), 1);
}

// =========================================================================
// Legacy chat
// =========================================================================

#[test]
fn test_legacy_without_self_id_uses_resolver() {
    let export = r#"{"conversation_state": [
        {"conversation_state": {
            "conversation": {"participant_data": [
                {"id": {"gaia_id": "1"}, "fallback_name": "Sam"},
                {"id": {"gaia_id": "2"}, "fallback_name": "Bob"}
            ]},
            "event": [
                {"sender_id": {"gaia_id": "1"}, "timestamp": "1700000000000000",
                 "chat_message": {"message_content": {"segment": [{"text": "one"}]}}}
            ]
        }},
        {"conversation_state": {
            "conversation": {"participant_data": [
                {"id": {"gaia_id": "1"}, "fallback_name": "Sam"},
                {"id": {"gaia_id": "3"}, "fallback_name": "Cy"}
            ]},
            "event": [
                {"sender_id": {"gaia_id": "1"}, "timestamp": "1700000001000000",
                 "chat_message": {"message_content": {"segment": [{"text": "two"}]}}},
                {"sender_id": {"gaia_id": "3"}, "timestamp": "1700000002000000",
                 "chat_message": {"message_content": {"segment": [{"text": "three"}]}}}
            ]
        }}
    ]}"#;
    let batch = LegacyImporter::new()
        .parse_str(export, &ImportContext::new())
        .unwrap();
    assert_eq!(batch.local_identity.as_deref(), Some("1"));
    let directions: Vec<Direction> = batch.messages.iter().map(|m| m.direction()).collect();
    assert_eq!(
        directions,
        vec![Direction::Sent, Direction::Sent, Direction::Received]
    );
}

// =========================================================================
// Mail
// =========================================================================

#[test]
fn test_mail_html_only_body_is_stripped() {
    let mbox = "From bob@x.com Tue Nov 14 22:13:20 2023\n\
From: Bob <bob@x.com>\n\
To: me@x.com\n\
Subject: Hello\n\
Date: Tue, 14 Nov 2023 22:13:20 +0000\n\
Content-Type: text/html; charset=utf-8\n\
\n\
<html><body><p>Hi&nbsp;there</p></body></html>\n";
    let ctx = ImportContext::new().with_local_email("me@x.com");
    let batch = MailImporter::new().parse_str(mbox, "inbox.mbox", &ctx).unwrap();
    let msg = &batch.messages[0];
    assert_eq!(msg.body(), "Hi there");
    assert_eq!(msg.from().name(), "Bob");
    assert_eq!(msg.direction(), Direction::Received);
}

#[test]
fn test_mail_without_date_is_skipped() {
    let mbox = "From a@x.com Tue Nov 14 22:13:20 2023\n\
From: a@x.com\n\
To: b@x.com\n\
Subject: undated\n\
\n\
body\n";
    let batch = MailImporter::new()
        .parse_str(mbox, "m.mbox", &ImportContext::new())
        .unwrap();
    assert!(batch.is_empty());
    assert_eq!(batch.skipped, 1);
}

#[test]
fn test_mail_empty_archive_is_error() {
    let err = MailImporter::new()
        .parse_str("", "m.mbox", &ImportContext::new())
        .unwrap_err();
    assert!(err.is_parse());
}

// =========================================================================
// Registry
// =========================================================================

#[test]
fn test_empty_mbox_file_fails_its_source_only() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("empty.mbox"), "").unwrap();

    let outcome = ImporterRegistry::new()
        .import_root(dir.path(), &ImportContext::new())
        .unwrap();
    assert_eq!(outcome.detections.len(), 1);
    assert_eq!(outcome.detections[0].source, Source::Mail);
    assert_eq!(outcome.status(), CorpusStatus::AllFailed);
}

#[test]
fn test_root_can_be_a_single_file() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("sms-1.xml");
    fs::write(
        &file,
        r#"<smses><sms address="+15551234567" date="1700000000000" type="1" body="x" /></smses>"#,
    )
    .unwrap();

    let outcome = ImporterRegistry::new()
        .import_root(&file, &ImportContext::new())
        .unwrap();
    assert_eq!(outcome.status(), CorpusStatus::Imported);
    assert_eq!(outcome.messages.len(), 1);
}

// =========================================================================
// Merging and output
// =========================================================================

#[test]
fn test_short_names_never_match() {
    let contacts = vec![Contact::new("Al"), Contact::new("Al.")];
    let groups = find_candidates(&contacts, &MergeConfig::default(), &DecisionLog::new());
    assert!(groups.is_empty());
}

#[test]
fn test_country_code_phone_matches_local_number() {
    let contacts = vec![
        Contact::from_address("+1 (555) 123-4567"),
        Contact::new("Bob").with_phone("555.123.4567"),
    ];
    let groups = find_candidates(&contacts, &MergeConfig::default(), &DecisionLog::new());
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].suggested().name(), "Bob");
}

#[test]
fn test_jsonl_keeps_unicode_and_newlines_on_one_line() {
    let xml = r#"<smses><sms address="+15551234567" date="1700000000000" type="1" body="line1&#10;Привет 🎉" /></smses>"#;
    let batch = SmsImporter::new()
        .parse_str(xml, "sms.xml", &ImportContext::new())
        .unwrap();
    let jsonl = to_format_string(&batch.messages, OutputFormat::Jsonl).unwrap();
    assert_eq!(jsonl.lines().count(), 1);
    assert!(jsonl.contains("Привет 🎉"));
}
