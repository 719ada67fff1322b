//! Example: Using chatunify as a library
//!
//! Builds a small export tree, imports it, and walks through the merge
//! workflow a front end would drive.
//!
//! Run with: cargo run --example library_usage

use std::fs;

use chatunify::prelude::*;

const SMS_BACKUP: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>
<smses count="2">
  <sms address="+15551234567" date="1700000000000" type="2" body="running late" contact_name="(Unknown)" />
  <sms address="+15551234567" date="1700000060000" type="1" body="no worries" contact_name="Bob Stone" />
</smses>"#;

const SOCIAL_EXPORT: &str = r#"{
    "participants": [{"name": "Bob Stone"}, {"name": "Me"}],
    "messages": [
        {"sender_name": "Bob Stone", "timestamp_ms": 1700000100000, "content": "see you there"}
    ]
}"#;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("=== chatunify Library Usage Examples ===\n");

    let dir = tempfile::tempdir()?;
    let root = dir.path().join("exports");
    fs::create_dir_all(root.join("backup"))?;
    fs::create_dir_all(root.join("inbox").join("bob_1"))?;
    fs::write(root.join("backup").join("sms-1.xml"), SMS_BACKUP)?;
    fs::write(root.join("inbox").join("bob_1").join("message_1.json"), SOCIAL_EXPORT)?;

    // Example 1: Detect sources
    println!("1. Detecting sources:");
    let registry = ImporterRegistry::new();
    let detections = registry.scan(&root)?;
    for detection in &detections {
        println!("   {}", detection);
    }

    // Example 2: Import everything that was detected
    println!("\n2. Importing:");
    let ctx = ImportContext::new();
    let outcome = registry.import(detections, &ctx);
    println!("   Status: {:?}", outcome.status());
    for msg in &outcome.messages {
        println!(
            "   [{}] {} -> {}: {}",
            msg.source_application(),
            msg.from(),
            msg.to(),
            msg.body()
        );
    }

    // Example 3: Find contacts that look like the same person
    println!("\n3. Merge candidates:");
    let contacts = collect_contacts(&outcome.messages);
    let mut log = DecisionLog::new();
    let groups = find_candidates(&contacts, &MergeConfig::default(), &log);
    for group in &groups {
        println!("   [{}] suggested: {}", group.index, group.suggested());
        for contact in &group.contacts {
            println!("       - {}", contact);
        }
    }

    // Example 4: Accept the first suggestion and apply it
    if let Some(group) = groups.first() {
        println!("\n4. Applying the first suggestion:");
        log.record(MergeDecision::merge(
            group.signatures(),
            &group.suggested(),
            "same person",
        ))?;
        let merged = apply_merges(outcome.messages, &log.plan());
        println!("{}", to_jsonl(&merged)?);
    }

    println!("\n=== Done! ===");
    Ok(())
}
