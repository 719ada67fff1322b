//! mbox splitting and MIME message extraction.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use mailparse::{DispositionType, MailAddr, MailHeaderMap, ParsedMail, addrparse, dateparse, parse_mail};
use regex::Regex;

use crate::contact::Contact;
use crate::message::{MediaAttachment, guess_mime};
use crate::timestamp::{EpochUnit, to_utc};

static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|head)\b.*?</(script|style|head)>").expect("valid regex")
});
static BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p>|</div>|</tr>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("valid regex"));
static SUBJECT_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*((re|fwd?|aw|wg|sv)\s*(\[\d+\])?\s*:\s*)+").expect("valid regex")
});

/// Splits an mbox file into raw RFC 822 messages.
///
/// Messages start at lines beginning with `From `; the separator line itself
/// is dropped and one level of `>From ` quoting is undone.
pub fn split_mbox(content: &str) -> Vec<String> {
    let mut messages = Vec::new();
    let mut current: Option<String> = None;

    for line in content.split_inclusive('\n') {
        if line.starts_with("From ") {
            if let Some(done) = current.take() {
                messages.push(done);
            }
            current = Some(String::new());
            continue;
        }
        let Some(buf) = current.as_mut() else {
            continue;
        };
        let stripped = line.trim_start_matches('>');
        if line.starts_with('>') && stripped.starts_with("From ") {
            buf.push_str(&line[1..]);
        } else {
            buf.push_str(line);
        }
    }
    if let Some(done) = current {
        messages.push(done);
    }
    messages
}

/// Reduces HTML to readable text.
pub fn strip_html(html: &str) -> String {
    let text = BLOCK_RE.replace_all(html, "");
    let text = BREAK_RE.replace_all(&text, "\n");
    let text = TAG_RE.replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    BLANK_LINES_RE
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}

/// Subject with reply/forward prefixes removed, lowercased. Used as the
/// conversation key for identity resolution.
pub fn normalize_subject(subject: &str) -> String {
    SUBJECT_PREFIX_RE
        .replace(subject, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Fields pulled out of one MIME message.
#[derive(Debug, Clone)]
pub struct RawMail {
    pub from: Option<Contact>,
    pub to: Vec<Contact>,
    pub timestamp: Option<DateTime<Utc>>,
    pub subject: Option<String>,
    pub labels: Option<String>,
    pub text: Option<String>,
    pub html: Option<String>,
    /// `(filename, mime type)` of every attachment part.
    pub attachments: Vec<(String, String)>,
}

impl RawMail {
    /// Body text: the plain part, or stripped HTML when there is none (or
    /// when `prefer_html` is set).
    pub fn body(&self, prefer_html: bool) -> String {
        let html = || self.html.as_deref().map(strip_html);
        let text = || self.text.as_deref().map(|t| t.trim().to_string());
        let body = if prefer_html {
            html().or_else(text)
        } else {
            text().or_else(html)
        };
        body.unwrap_or_default()
    }

    /// Attachment references located at `{file_label}/message-{index}/{name}`.
    pub fn media(&self, file_label: &str, index: usize) -> Vec<MediaAttachment> {
        self.attachments
            .iter()
            .map(|(name, mime)| {
                MediaAttachment::new(format!("{file_label}/message-{index}/{name}"), mime.as_str())
            })
            .collect()
    }
}

fn contacts_from_header(value: &str) -> Vec<Contact> {
    let Ok(list) = addrparse(value) else {
        return Vec::new();
    };
    let single = |info: &mailparse::SingleInfo| {
        let name = info
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&info.addr);
        Contact::new(name).with_email(&info.addr)
    };
    list.iter()
        .flat_map(|addr| match addr {
            MailAddr::Single(info) => vec![single(info)],
            MailAddr::Group(group) => group.addrs.iter().map(single).collect(),
        })
        .collect()
}

fn part_filename(part: &ParsedMail<'_>) -> Option<String> {
    part.get_content_disposition()
        .params
        .get("filename")
        .cloned()
        .or_else(|| part.ctype.params.get("name").cloned())
        .filter(|n| !n.trim().is_empty())
}

fn collect_parts(part: &ParsedMail<'_>, mail: &mut RawMail) {
    if !part.subparts.is_empty() {
        for sub in &part.subparts {
            collect_parts(sub, mail);
        }
        return;
    }

    let mime = part.ctype.mimetype.to_ascii_lowercase();
    let is_attachment = matches!(
        part.get_content_disposition().disposition,
        DispositionType::Attachment
    );

    if !is_attachment && mime == "text/plain" && mail.text.is_none() {
        mail.text = part.get_body().ok();
    } else if !is_attachment && mime == "text/html" && mail.html.is_none() {
        mail.html = part.get_body().ok();
    } else if is_attachment || !mime.starts_with("text/") {
        let index = mail.attachments.len();
        let name = part_filename(part).unwrap_or_else(|| format!("attachment-{index}"));
        let mime = if mime.is_empty() {
            guess_mime(&name).to_string()
        } else {
            mime
        };
        mail.attachments.push((name, mime));
    }
}

/// Parses one raw message. Returns `None` if the MIME structure is unreadable.
pub fn parse_raw_mail(raw: &str) -> Option<RawMail> {
    let parsed = parse_mail(raw.as_bytes()).ok()?;
    let headers = &parsed.headers;

    let from = headers
        .get_first_value("From")
        .and_then(|v| contacts_from_header(&v).into_iter().next());
    let mut to: Vec<Contact> = headers
        .get_first_value("To")
        .map(|v| contacts_from_header(&v))
        .unwrap_or_default();
    if to.is_empty() {
        to = headers
            .get_first_value("Cc")
            .map(|v| contacts_from_header(&v))
            .unwrap_or_default();
    }
    let timestamp = headers
        .get_first_value("Date")
        .and_then(|d| dateparse(&d).ok())
        .and_then(|secs| to_utc(secs, EpochUnit::Seconds));

    let mut mail = RawMail {
        from,
        to,
        timestamp,
        subject: headers
            .get_first_value("Subject")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        labels: headers.get_first_value("X-Gmail-Labels"),
        text: None,
        html: None,
        attachments: Vec::new(),
    };
    collect_parts(&parsed, &mut mail);
    Some(mail)
}
