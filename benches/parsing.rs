//! Benchmarks for chatunify importing and merging operations.
//!
//! Run with: `cargo bench`
//! Run specific group: `cargo bench --bench parsing -- sms`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chatunify::config::MergeConfig;
use chatunify::importer::ImportContext;
use chatunify::importers::{GroupChatImporter, MailImporter, SmsImporter, SocialImporter};
use chatunify::merge::{DecisionLog, MergeDecision, MergePlan, apply_merges, collect_contacts, find_candidates};
use chatunify::output::{to_csv, to_json, to_jsonl};
use chatunify::{Contact, Message};

use chrono::{Duration, TimeZone, Utc};

// =============================================================================
// Test Data Generators
// =============================================================================

fn generate_sms_xml(count: usize) -> String {
    let mut records = Vec::with_capacity(count);
    for i in 0..count {
        let kind = if i % 2 == 0 { 1 } else { 2 };
        let timestamp = 1705314600000i64 + (i as i64 * 60000);
        records.push(format!(
            r#"<sms address="+1555000{:04}" date="{}" type="{}" body="Message number {}" contact_name="Contact {}" />"#,
            i % 50,
            timestamp,
            kind,
            i,
            i % 50
        ));
    }
    format!(
        "<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>\n<smses count=\"{}\">\n{}\n</smses>",
        count,
        records.join("\n")
    )
}

fn generate_social_json(count: usize) -> String {
    let mut messages = Vec::with_capacity(count);
    for i in 0..count {
        let sender = if i % 2 == 0 { "Alice" } else { "Me" };
        let timestamp = 1705314600000i64 + (i as i64 * 60000);
        messages.push(format!(
            r#"{{"sender_name": "{}", "timestamp_ms": {}, "content": "Message number {}"}}"#,
            sender, timestamp, i
        ));
    }
    format!(
        r#"{{"participants": [{{"name": "Alice"}}, {{"name": "Me"}}], "title": "Alice", "messages": [{}]}}"#,
        messages.join(",\n")
    )
}

/// Ten conversations; `me@x.com` speaks in all of them.
fn generate_group_conversations(count: usize) -> Vec<(String, String)> {
    (0..10)
        .map(|c| {
            let messages: Vec<String> = (0..count / 10)
                .map(|i| {
                    let email = if i % 2 == 0 {
                        "me@x.com".to_string()
                    } else {
                        format!("user{}@x.com", c)
                    };
                    format!(
                        r#"{{"creator": {{"name": "{}", "email": "{}"}}, "created_date": {}, "text": "Message number {}"}}"#,
                        email, email, 1705314600 + i as i64 * 60, i
                    )
                })
                .collect();
            (format!("Space {c}"), format!(r#"{{"messages": [{}]}}"#, messages.join(",")))
        })
        .collect()
}

fn generate_mbox(count: usize) -> String {
    (0..count)
        .map(|i| {
            let (from, to) = if i % 2 == 0 {
                ("me@x.com", "bob@x.com")
            } else {
                ("bob@x.com", "me@x.com")
            };
            format!(
                "From {from} Tue Nov 14 22:13:20 2023\nFrom: {from}\nTo: {to}\nSubject: Thread {}\nDate: Tue, 14 Nov 2023 22:13:20 +0000\n\nMessage number {i}\n",
                i % 20
            )
        })
        .collect()
}

fn generate_messages(count: usize) -> Vec<Message> {
    let base = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
    let names = ["Alice", "Alicia", "Bob", "Bobby Smith", "Bob Smith", "Carol", "Dave"];
    (0..count)
        .map(|i| {
            let from = Contact::new(names[i % names.len()]).with_phone(&format!("555-000-{:04}", i % 40));
            Message::new("bench", from, Contact::new("Me"), base + Duration::minutes(i as i64))
                .with_body(format!("Message number {}", i))
        })
        .collect()
}

// =============================================================================
// Import Benchmarks
// =============================================================================

fn bench_sms_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("sms_import");
    let importer = SmsImporter::new();
    let ctx = ImportContext::new();

    for size in [100_usize, 1_000, 10_000, 50_000] {
        let xml = generate_sms_xml(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &xml, |b, xml| {
            b.iter(|| {
                let batch = importer.parse_str(black_box(xml), "sms.xml", &ctx).unwrap();
                black_box(batch)
            });
        });
    }
    group.finish();
}

fn bench_social_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("social_import");
    let importer = SocialImporter::new();
    let ctx = ImportContext::new();

    for size in [100_usize, 1_000, 10_000, 50_000] {
        let json = generate_social_json(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &json, |b, json| {
            b.iter(|| {
                let batch = importer.parse_str(black_box(json), &ctx).unwrap();
                black_box(batch)
            });
        });
    }
    group.finish();
}

fn bench_groupchat_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("groupchat_import");
    let importer = GroupChatImporter::new();
    let ctx = ImportContext::new();

    for size in [100_usize, 1_000, 10_000] {
        let owned = generate_group_conversations(size);
        let conversations: Vec<(&str, &str, Option<&str>)> = owned
            .iter()
            .map(|(label, json)| (label.as_str(), json.as_str(), None))
            .collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &conversations,
            |b, conversations| {
                b.iter(|| {
                    let batch = importer
                        .parse_conversations(black_box(conversations), &ctx)
                        .unwrap();
                    black_box(batch)
                });
            },
        );
    }
    group.finish();
}

fn bench_mail_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("mail_import");
    let importer = MailImporter::new();
    let ctx = ImportContext::new();

    for size in [100_usize, 1_000, 5_000] {
        let mbox = generate_mbox(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &mbox, |b, mbox| {
            b.iter(|| {
                let batch = importer.parse_str(black_box(mbox), "all.mbox", &ctx).unwrap();
                black_box(batch)
            });
        });
    }
    group.finish();
}

// =============================================================================
// Merge Benchmarks
// =============================================================================

fn bench_find_candidates(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_candidates");
    let config = MergeConfig::default();
    let log = DecisionLog::new();

    for size in [100_usize, 1_000, 10_000] {
        let contacts = collect_contacts(&generate_messages(size));
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &contacts, |b, contacts| {
            b.iter(|| black_box(find_candidates(black_box(contacts), &config, &log)));
        });
    }
    group.finish();
}

fn bench_apply_merges(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_merges");
    let config = MergeConfig::default();

    for size in [1_000_usize, 10_000, 100_000] {
        let messages = generate_messages(size);
        let groups = find_candidates(&collect_contacts(&messages), &config, &DecisionLog::new());
        let decisions: Vec<MergeDecision> = groups
            .iter()
            .map(|g| MergeDecision::merge(g.signatures(), &g.suggested(), "bench"))
            .collect();
        let plan = MergePlan::from_decisions(&decisions);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &messages, |b, messages| {
            b.iter(|| black_box(apply_merges(black_box(messages.clone()), &plan)));
        });
    }
    group.finish();
}

// =============================================================================
// Output Benchmarks
// =============================================================================

fn bench_output(c: &mut Criterion) {
    let mut group = c.benchmark_group("output");
    let messages = generate_messages(10_000);
    group.throughput(Throughput::Elements(messages.len() as u64));

    group.bench_function("json", |b| b.iter(|| black_box(to_json(black_box(&messages)).unwrap())));
    group.bench_function("jsonl", |b| b.iter(|| black_box(to_jsonl(black_box(&messages)).unwrap())));
    group.bench_function("csv", |b| b.iter(|| black_box(to_csv(black_box(&messages)).unwrap())));
    group.finish();
}

criterion_group!(
    benches,
    bench_sms_import,
    bench_social_import,
    bench_groupchat_import,
    bench_mail_import,
    bench_find_candidates,
    bench_apply_merges,
    bench_output,
);

criterion_main!(benches);
