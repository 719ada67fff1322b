//! mbox mail archive importer.
//!
//! Direction comes from the first signal available:
//!
//! 1. an `X-Gmail-Labels` header naming a configured sent label
//! 2. addresses declared with [`ImportContext::with_local_email`]
//! 3. the sender seen in the most distinct threads, where a thread is the
//!    normalized subject

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::contact::Contact;
use crate::error::{Result, UnifyError};
use crate::identity::{IdentityResolver, Resolution, classify};
use crate::importer::{ImportBatch, ImportContext, Importer, Source};
use crate::message::{Direction, Message};
use crate::parsing::mail::{RawMail, normalize_subject, parse_raw_mail, split_mbox};

use super::{SNIFF_BYTES, file_label, has_extension, read_head};

const NO_SUBJECT: &str = "(no subject)";

/// Importer for mbox archives.
#[derive(Debug, Default)]
pub struct MailImporter;

impl MailImporter {
    pub fn new() -> Self {
        Self
    }

    /// Imports an mbox archive already in memory. `label` prefixes
    /// attachment locators.
    pub fn parse_str(&self, content: &str, label: &str, ctx: &ImportContext) -> Result<ImportBatch> {
        let raw = split_mbox(content);
        if raw.is_empty() {
            return Err(UnifyError::mail_parse("no \"From \" separator lines found", None));
        }

        let mails: Vec<Option<RawMail>> = raw.iter().map(|m| parse_raw_mail(m)).collect();
        let identity = self.resolve_identity(&mails, ctx);
        let config = &ctx.config().mail;

        let mut skipped = 0;
        let mut messages = Vec::with_capacity(mails.len());
        for (index, mail) in mails.iter().enumerate() {
            let Some(mail) = mail else {
                skipped += 1;
                continue;
            };
            let (Some(from), Some(timestamp)) = (mail.from.as_ref(), mail.timestamp) else {
                skipped += 1;
                continue;
            };

            let from_email = from.emails().iter().next().map(String::as_str);
            let direction = if mail
                .labels
                .as_deref()
                .is_some_and(|l| config.is_sent_label_header(l))
            {
                Direction::Sent
            } else if !ctx.local_emails().is_empty() {
                match from_email {
                    Some(email) if ctx.is_local_email(email) => Direction::Sent,
                    Some(_) => Direction::Received,
                    None => Direction::Unknown,
                }
            } else {
                classify(from_email, identity.as_deref())
            };

            let subject = mail.subject.as_deref().unwrap_or(NO_SUBJECT);
            let to = match direction {
                Direction::Received => mail
                    .to
                    .iter()
                    .find(|c| c.emails().iter().any(|e| self.is_owner(e, identity.as_deref(), ctx)))
                    .or_else(|| mail.to.first())
                    .cloned()
                    .unwrap_or_else(|| ctx.self_contact().clone()),
                Direction::Sent | Direction::Unknown => mail
                    .to
                    .first()
                    .cloned()
                    .unwrap_or_else(|| Contact::new(subject)),
            };

            let message = Message::new(Source::Mail.tag(), from.clone(), to, timestamp)
                .with_body(mail.body(config.prefer_html))
                .with_direction(direction)
                .with_attachments(mail.media(label, index))
                .with_conversation(subject);
            if message.is_empty() {
                skipped += 1;
                continue;
            }
            messages.push(message);
        }

        if skipped > 0 {
            debug!(label, skipped, "skipped mail without sender, date or content");
        }
        let local = ctx.local_emails().iter().next().cloned().or(identity);
        Ok(ImportBatch::new(messages, skipped).with_local_identity(local))
    }

    fn is_owner(&self, email: &str, identity: Option<&str>, ctx: &ImportContext) -> bool {
        ctx.is_local_email(email) || identity.is_some_and(|id| id.eq_ignore_ascii_case(email))
    }

    fn resolve_identity(&self, mails: &[Option<RawMail>], ctx: &ImportContext) -> Option<String> {
        if !ctx.local_emails().is_empty() {
            return None;
        }
        let mut resolver = IdentityResolver::new();
        for mail in mails.iter().flatten() {
            let Some(email) = mail.from.as_ref().and_then(|f| f.emails().iter().next()) else {
                continue;
            };
            let thread = normalize_subject(mail.subject.as_deref().unwrap_or_default());
            resolver.observe(&thread, email);
        }
        match resolver.resolve() {
            Resolution::Resolved(id) => {
                info!(identity = %id, "resolved mailbox owner");
                Some(id)
            }
            Resolution::Tie(candidates) => {
                warn!(?candidates, "mailbox owner is ambiguous");
                None
            }
            Resolution::NoSignal => None,
        }
    }
}

impl Importer for MailImporter {
    fn name(&self) -> &'static str {
        "Mail Archive"
    }

    fn source(&self) -> Source {
        Source::Mail
    }

    fn can_import(&self, path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }
        if has_extension(path, "mbox") {
            return true;
        }
        read_head(path, SNIFF_BYTES).is_some_and(|head| {
            head.starts_with("From ") && head.lines().any(|l| l.starts_with("From:"))
        })
    }

    fn import(&self, path: &Path, ctx: &ImportContext) -> Result<ImportBatch> {
        let bytes = fs::read(path)?;
        let content = String::from_utf8_lossy(&bytes);
        let batch = self
            .parse_str(&content, &file_label(path), ctx)
            .map_err(|e| match e {
                UnifyError::Parse { format, source, .. } => UnifyError::Parse {
                    format,
                    source,
                    path: Some(path.to_path_buf()),
                },
                other => other,
            })?;
        info!(path = %path.display(), messages = batch.len(), "imported mail archive");
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(from: &str, to: &str, subject: &str, extra: &str) -> String {
        format!(
            "From {from} Tue Nov 14 22:13:20 2023\n\
From: {from}\n\
To: {to}\n\
Subject: {subject}\n\
Date: Tue, 14 Nov 2023 22:13:20 +0000\n\
{extra}\n\
body of {subject}\n"
        )
    }

    #[test]
    fn test_resolves_owner_by_threads() {
        let mbox = [
            mail("me@x.com", "bob@x.com", "Lunch", ""),
            mail("bob@x.com", "me@x.com", "Re: Lunch", ""),
            mail("me@x.com", "cy@x.com", "Trip", ""),
        ]
        .concat();
        let batch = MailImporter::new()
            .parse_str(&mbox, "all.mbox", &ImportContext::new())
            .unwrap();

        assert_eq!(batch.local_identity.as_deref(), Some("me@x.com"));
        assert_eq!(batch.messages.len(), 3);
        assert_eq!(batch.messages[0].direction(), Direction::Sent);
        assert_eq!(batch.messages[1].direction(), Direction::Received);
        assert!(batch.messages[1].to().has_email("me@x.com"));
        assert_eq!(batch.messages[1].conversation(), Some("Re: Lunch"));
        assert_eq!(batch.messages[0].body(), "body of Lunch");
    }

    #[test]
    fn test_sent_label_wins() {
        let mbox = [
            mail("a@x.com", "b@x.com", "One", "X-Gmail-Labels: Sent,Important\n"),
            mail("b@x.com", "a@x.com", "Two", "X-Gmail-Labels: Inbox\n"),
        ]
        .concat();
        let batch = MailImporter::new()
            .parse_str(&mbox, "all.mbox", &ImportContext::new())
            .unwrap();
        assert_eq!(batch.messages[0].direction(), Direction::Sent);
        // a@x.com and b@x.com tie on threads
        assert_eq!(batch.messages[1].direction(), Direction::Unknown);
    }

    #[test]
    fn test_configured_address() {
        let mbox = mail("b@x.com", "a@x.com", "Hi", "");
        let ctx = ImportContext::new().with_local_email("a@x.com");
        let batch = MailImporter::new().parse_str(&mbox, "m.mbox", &ctx).unwrap();
        assert_eq!(batch.messages[0].direction(), Direction::Received);
        assert_eq!(batch.local_identity.as_deref(), Some("a@x.com"));
    }

    #[test]
    fn test_skips_mail_without_date() {
        let mbox = "From x Tue Nov 14 22:13:20 2023\nFrom: a@x.com\nSubject: no date\n\nbody\n";
        let batch = MailImporter::new()
            .parse_str(mbox, "m.mbox", &ImportContext::new())
            .unwrap();
        assert!(batch.messages.is_empty());
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn test_skips_mail_without_content() {
        let empty = "From a@x.com Tue Nov 14 22:13:20 2023\n\
From: a@x.com\n\
To: b@x.com\n\
Subject: blank\n\
Date: Tue, 14 Nov 2023 22:13:20 +0000\n\
\n";
        let mbox = [empty.to_string(), mail("b@x.com", "a@x.com", "hello", "")].concat();
        let batch = MailImporter::new()
            .parse_str(&mbox, "m.mbox", &ImportContext::new())
            .unwrap();

        assert_eq!(batch.messages.len(), 1);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.messages[0].body(), "body of hello");
    }

    #[test]
    fn test_not_an_mbox() {
        let err = MailImporter::new()
            .parse_str("Subject: stray\n\nhello", "m.mbox", &ImportContext::new())
            .unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_can_import() {
        let dir = tempfile::tempdir().unwrap();
        let named = dir.path().join("All mail.MBOX");
        fs::write(&named, "").unwrap();
        let sniffed = dir.path().join("inbox");
        fs::write(&sniffed, mail("a@x.com", "b@x.com", "Hi", "")).unwrap();
        let text = dir.path().join("notes.txt");
        fs::write(&text, "From the desk of nobody").unwrap();

        let importer = MailImporter::new();
        assert!(importer.can_import(&named));
        assert!(importer.can_import(&sniffed));
        assert!(!importer.can_import(&text));
    }
}
