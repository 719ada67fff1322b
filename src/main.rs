//! # chatunify CLI
//!
//! Command-line interface for the chatunify library.

use std::process;
use std::time::Instant;

use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

use chatunify::cli::{Cli, Command, CorpusArgs, DecisionArgs, ImportArgs, MergeArgs, SkipArgs};
use chatunify::config::Config;
use chatunify::merge::{
    CandidateGroup, DecisionLog, MergeDecision, apply_merges, candidate, collect_contacts,
    find_candidates,
};
use chatunify::output::write_to_format;
use chatunify::registry::{CorpusStatus, ImportOutcome};
use chatunify::{Result, UnifyError};

fn main() {
    let cli = <Cli as ClapParser>::parse();
    init_tracing(cli.log_level());

    if let Err(e) = run(cli.command) {
        eprintln!("❌ Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Scan(args) => scan(&args),
        Command::Import(args) => import(&args),
        Command::Candidates(args) => candidates(&args),
        Command::Merge(args) => merge(&args),
        Command::Skip(args) => skip(&args),
    }
}

fn header(command: &str, args: &CorpusArgs) {
    println!("📦 chatunify v{} {}", env!("CARGO_PKG_VERSION"), command);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📂 Root:    {}", args.root.display());
    if !args.only.is_empty() {
        let names: Vec<String> = args.only.iter().map(ToString::to_string).collect();
        println!("🔎 Only:    {}", names.join(", "));
    }
    for email in &args.local_emails {
        println!("👤 Me:      {}", email);
    }
    println!();
}

fn scan(args: &CorpusArgs) -> Result<()> {
    header("scan", args);
    let config = args.load_config()?;
    let detections = args.registry(&config).scan(&args.root)?;

    if detections.is_empty() {
        println!("🤷 No sources found under {}", args.root.display());
        return Ok(());
    }
    println!("🔍 Detected {} source(s):", detections.len());
    for detection in &detections {
        println!("   {}", detection);
    }
    Ok(())
}

/// Imports the corpus, turning the two empty corpus outcomes into errors.
fn load_corpus(args: &CorpusArgs, config: Config) -> Result<ImportOutcome> {
    let registry = args.registry(&config);
    let ctx = args.context(config);

    println!("⏳ Importing...");
    let start = Instant::now();
    let outcome = registry.import_root(&args.root, &ctx)?;

    for report in &outcome.reports {
        print!("   ✔ {}: {} messages", report.detection, report.messages);
        if report.skipped > 0 {
            print!(", {} skipped", report.skipped);
        }
        if let Some(identity) = &report.local_identity {
            print!(" (me = {})", identity);
        }
        println!();
    }
    for failure in &outcome.failures {
        println!("   ✘ {}: {}", failure.detection, failure.error);
    }
    println!(
        "   Found {} messages ({:.2}s)",
        outcome.messages.len(),
        start.elapsed().as_secs_f64()
    );

    match outcome.status() {
        CorpusStatus::NothingDetected => Err(UnifyError::invalid_format(
            "corpus",
            format!("no importable sources found under {}", args.root.display()),
        )),
        CorpusStatus::AllFailed => Err(UnifyError::invalid_format(
            "corpus",
            format!(
                "all {} detected source(s) failed to import",
                outcome.detections.len()
            ),
        )),
        CorpusStatus::Imported | CorpusStatus::PartiallyImported => Ok(outcome),
    }
}

fn import(args: &ImportArgs) -> Result<()> {
    let total_start = Instant::now();
    let format = args.resolved_format();

    header("import", &args.corpus);
    println!("💾 Output:  {}", args.output.display());
    println!("📄 Format:  {}", format);
    println!();

    let outcome = load_corpus(&args.corpus, args.corpus.load_config()?)?;
    let skipped = outcome.skipped();
    let failed = outcome.failures.len();
    let imported = outcome.messages.len();

    let messages = if args.no_merge {
        println!("⏭️  Skipping merge (--no-merge)");
        outcome.messages
    } else {
        let log = DecisionLog::load(&args.decisions)?;
        if log.is_empty() {
            outcome.messages
        } else {
            println!("🔀 Applying {} merge decision(s)...", log.len());
            apply_merges(outcome.messages, &log.plan())
        }
    };

    println!("💾 Writing {}...", format);
    let write_start = Instant::now();
    write_to_format(&messages, &args.output, format)?;
    println!("   Written in {:.2}s", write_start.elapsed().as_secs_f64());

    println!();
    println!("✅ Done! Output saved to {}", args.output.display());

    println!();
    println!("📊 Summary:");
    println!("   Messages:  {}", imported);
    println!("   Skipped:   {} records", skipped);
    if failed > 0 {
        println!("   Failed:    {} source(s)", failed);
    }

    let total_time = total_start.elapsed();
    println!();
    println!("⚡ Performance:");
    println!("   Total time:  {:.2}s", total_time.as_secs_f64());
    println!(
        "   Throughput:  {:.0} messages/sec",
        imported as f64 / total_time.as_secs_f64().max(f64::EPSILON)
    );
    Ok(())
}

fn pending(args: &DecisionArgs) -> Result<(DecisionLog, Vec<CandidateGroup>)> {
    let config = args.corpus.load_config()?;
    let merge_config = config.merge.clone();
    let outcome = load_corpus(&args.corpus, config)?;
    let log = DecisionLog::load(&args.decisions)?;
    let groups = find_candidates(&collect_contacts(&outcome.messages), &merge_config, &log);
    Ok((log, groups))
}

fn candidates(args: &DecisionArgs) -> Result<()> {
    header("candidates", &args.corpus);
    let (log, groups) = pending(args)?;
    println!();

    if groups.is_empty() {
        println!("✅ No pending merge candidates ({} decision(s) recorded)", log.len());
        return Ok(());
    }

    println!("👥 {} pending candidate group(s):", groups.len());
    for group in &groups {
        println!();
        println!("[{}] suggested: {}", group.index, group.suggested());
        for contact in &group.contacts {
            println!("     - {}", contact);
        }
        for reason in &group.reasons {
            println!("     · {}", reason);
        }
    }
    println!();
    println!("Confirm with `chatunify merge <ROOT> --group N` or decline with `chatunify skip <ROOT> --group N`.");
    Ok(())
}

fn merge(args: &MergeArgs) -> Result<()> {
    header("merge", &args.target.corpus);
    let (mut log, groups) = pending(&args.target)?;
    let group = candidate(&groups, args.group)?;
    let target = args.target_for(group);

    log.record(MergeDecision::merge(group.signatures(), &target, &args.reason))?;

    println!();
    println!("✅ Merged {} contact(s) into {}", group.contacts.len(), target);
    println!("   Decision log: {}", args.target.decisions.display());
    Ok(())
}

fn skip(args: &SkipArgs) -> Result<()> {
    header("skip", &args.target.corpus);
    let (mut log, groups) = pending(&args.target)?;
    let group = candidate(&groups, args.group)?;

    log.record(MergeDecision::skip(group.signatures(), &args.reason))?;

    println!();
    println!("⏭️  Group {} will not be suggested again", args.group);
    println!("   Decision log: {}", args.target.decisions.display());
    Ok(())
}
