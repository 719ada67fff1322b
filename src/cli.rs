//! Command-line interface definition using clap.
//!
//! This module defines:
//! - [`Cli`] - top-level arguments and global verbosity flags
//! - [`Command`] - the `scan`, `import`, `candidates`, `merge` and `skip`
//!   subcommands
//! - [`CorpusArgs`] - the export root and import options shared by every
//!   subcommand that reads the corpus
//!
//! [`Source`](crate::importer::Source) and
//! [`OutputFormat`](crate::output::OutputFormat) are parsed through their
//! `FromStr` impls, so CLI names and aliases match the library ones.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::contact::Contact;
use crate::error::Result;
use crate::importer::{ImportContext, Source};
use crate::merge::CandidateGroup;
use crate::output::OutputFormat;
use crate::registry::ImporterRegistry;

/// Default location of the merge decision log.
pub const DEFAULT_DECISIONS: &str = "merge_decisions.json";

/// Normalize personal messaging exports into one message and contact model.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatunify")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    chatunify scan ~/exports
    chatunify import ~/exports -o corpus.jsonl --me me@example.com
    chatunify import ~/exports --only sms,mbox -f csv -o corpus.csv
    chatunify candidates ~/exports
    chatunify merge ~/exports --group 0 --name \"John Smith\"
    chatunify skip ~/exports --group 1 --reason \"different people\"")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Show debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Log filter implied by the verbosity flags.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the sources detected under ROOT
    Scan(CorpusArgs),

    /// Import every detected source, apply merge decisions and write the corpus
    Import(ImportArgs),

    /// List pending merge candidate groups
    Candidates(DecisionArgs),

    /// Confirm a candidate group as one person
    Merge(MergeArgs),

    /// Mark a candidate group as different people
    Skip(SkipArgs),
}

/// Export root and the options that shape an import.
#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    /// Directory holding the exports
    pub root: PathBuf,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Restrict detection to these sources (sms, social/fb, groupchat/gchat, legacy/hangouts, mail/mbox)
    #[arg(long, value_name = "SRC", value_delimiter = ',')]
    pub only: Vec<Source>,

    /// Email address owned by you; may be repeated
    #[arg(long = "me", value_name = "EMAIL")]
    pub local_emails: Vec<String>,
}

impl CorpusArgs {
    /// Loads the configuration file, or defaults when none was given.
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load(path),
            None => Ok(Config::default()),
        }
    }

    /// Import context carrying `config` and every `--me` address.
    pub fn context(&self, config: Config) -> ImportContext {
        self.local_emails
            .iter()
            .fold(ImportContext::new().with_config(config), |ctx, email| {
                ctx.with_local_email(email)
            })
    }

    /// Registry restricted by `--only` and tuned by the scan section of `config`.
    pub fn registry(&self, config: &Config) -> ImporterRegistry {
        let registry = ImporterRegistry::new().with_scan_config(config.scan.clone());
        if self.only.is_empty() {
            registry
        } else {
            registry.only(&self.only)
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Path to output file
    #[arg(short, long, default_value = "unified.json")]
    pub output: PathBuf,

    /// Output format (json, jsonl, csv); inferred from the output extension when omitted
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Merge decision log
    #[arg(long, value_name = "FILE", default_value = DEFAULT_DECISIONS)]
    pub decisions: PathBuf,

    /// Write raw contacts without applying merge decisions
    #[arg(long)]
    pub no_merge: bool,
}

impl ImportArgs {
    /// Explicit `--format`, else the output extension, else JSON.
    pub fn resolved_format(&self) -> OutputFormat {
        self.format
            .or_else(|| OutputFormat::from_path(&self.output).ok())
            .unwrap_or_default()
    }
}

#[derive(Args, Debug, Clone)]
pub struct DecisionArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Merge decision log
    #[arg(long, value_name = "FILE", default_value = DEFAULT_DECISIONS)]
    pub decisions: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    #[command(flatten)]
    pub target: DecisionArgs,

    /// Index shown by `candidates`
    #[arg(short, long, value_name = "N")]
    pub group: usize,

    /// Canonical name (defaults to the suggested one)
    #[arg(long)]
    pub name: Option<String>,

    /// Canonical phone number; replaces the suggested ones
    #[arg(long = "phone", value_name = "PHONE")]
    pub phones: Vec<String>,

    /// Canonical email; replaces the suggested ones
    #[arg(long = "email", value_name = "EMAIL")]
    pub emails: Vec<String>,

    /// Free-text note stored with the decision
    #[arg(long, default_value = "")]
    pub reason: String,
}

impl MergeArgs {
    /// Canonical contact for `group`: the suggestion with any overrides applied.
    pub fn target_for(&self, group: &CandidateGroup) -> Contact {
        let suggested = group.suggested();
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| suggested.name().to_string());
        let phones: Vec<&str> = if self.phones.is_empty() {
            suggested.phone_numbers().iter().map(String::as_str).collect()
        } else {
            self.phones.iter().map(String::as_str).collect()
        };
        let emails: Vec<&str> = if self.emails.is_empty() {
            suggested.emails().iter().map(String::as_str).collect()
        } else {
            self.emails.iter().map(String::as_str).collect()
        };
        let contact = phones
            .into_iter()
            .fold(Contact::new(name), |c, phone| c.with_phone(phone));
        emails
            .into_iter()
            .fold(contact, |c, email| c.with_email(email))
    }
}

#[derive(Args, Debug, Clone)]
pub struct SkipArgs {
    #[command(flatten)]
    pub target: DecisionArgs,

    /// Index shown by `candidates`
    #[arg(short, long, value_name = "N")]
    pub group: usize,

    /// Free-text note stored with the decision
    #[arg(long, default_value = "")]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("chatunify").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_import_args() {
        let cli = parse(&[
            "import", "exports", "--only", "sms,mbox", "--me", "a@x.com", "--me", "b@x.com",
            "-o", "out.jsonl", "--no-merge",
        ]);
        let Command::Import(args) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(args.corpus.root, PathBuf::from("exports"));
        assert_eq!(args.corpus.only, vec![Source::Sms, Source::Mail]);
        assert_eq!(args.corpus.local_emails, vec!["a@x.com", "b@x.com"]);
        assert!(args.no_merge);
        assert_eq!(args.resolved_format(), OutputFormat::Jsonl);
        assert_eq!(args.decisions, PathBuf::from(DEFAULT_DECISIONS));
    }

    #[test]
    fn test_explicit_format_wins_over_extension() {
        let cli = parse(&["import", "x", "-o", "out.json", "-f", "csv"]);
        let Command::Import(args) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(args.resolved_format(), OutputFormat::Csv);
    }

    #[test]
    fn test_unknown_extension_defaults_to_json() {
        let cli = parse(&["import", "x", "-o", "corpus.out"]);
        let Command::Import(args) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(args.resolved_format(), OutputFormat::Json);
    }

    #[test]
    fn test_merge_args() {
        let cli = parse(&[
            "merge", "x", "--group", "2", "--name", "John", "--phone", "+1555", "--email",
            "j@x.com", "--reason", "same",
        ]);
        let Command::Merge(args) = cli.command else {
            panic!("expected merge");
        };
        assert_eq!(args.group, 2);
        assert_eq!(args.name.as_deref(), Some("John"));
        assert_eq!(args.phones, vec!["+1555"]);
        assert_eq!(args.emails, vec!["j@x.com"]);
        assert_eq!(args.reason, "same");
    }

    #[test]
    fn test_merge_target_overrides() {
        let group = CandidateGroup {
            index: 0,
            contacts: vec![
                Contact::new("Jon").with_email("jon@x.com"),
                Contact::new("Jonathan").with_phone("+15551234567"),
            ],
            reasons: Vec::new(),
        };

        let Command::Merge(args) = parse(&["merge", "x", "-g", "0"]).command else {
            panic!("expected merge");
        };
        assert_eq!(args.target_for(&group), group.suggested());

        let Command::Merge(args) =
            parse(&["merge", "x", "-g", "0", "--name", "Jon S", "--email", "js@x.com"]).command
        else {
            panic!("expected merge");
        };
        let target = args.target_for(&group);
        assert_eq!(target.name(), "Jon S");
        assert!(target.has_email("js@x.com"));
        assert!(!target.has_email("jon@x.com"));
        assert_eq!(target.phone_numbers(), group.suggested().phone_numbers());
    }

    #[test]
    fn test_skip_requires_group() {
        assert!(Cli::try_parse_from(["chatunify", "skip", "x"]).is_err());
    }

    #[test]
    fn test_unknown_source_rejected() {
        assert!(Cli::try_parse_from(["chatunify", "scan", "x", "--only", "telegram"]).is_err());
    }

    #[test]
    fn test_source_aliases() {
        let cli = parse(&["scan", "x", "--only", "fb,gchat,hangouts"]);
        let Command::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.only, vec![Source::Social, Source::GroupChat, Source::Legacy]);
    }

    #[test]
    fn test_log_level() {
        assert_eq!(parse(&["scan", "x"]).log_level(), "info");
        assert_eq!(parse(&["-v", "scan", "x"]).log_level(), "debug");
        assert_eq!(parse(&["scan", "x", "-q"]).log_level(), "warn");
        assert!(Cli::try_parse_from(["chatunify", "-v", "-q", "scan", "x"]).is_err());
    }
}
