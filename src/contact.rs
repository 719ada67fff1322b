//! Message participants.
//!
//! A [`Contact`] is one raw identity as it appeared in a source export: a
//! display name plus the phone numbers and email addresses attached to it.
//! Contacts are immutable; merging or renaming a person means building a new
//! `Contact` and substituting it wherever the old one was referenced.
//!
//! Equality and hashing go through [`ContactSignature`], a case-folded,
//! sorted rendering of name, phones and emails, so two contacts built
//! independently from the same raw data always compare equal.
//!
//! # Example
//!
//! ```
//! use chatunify::Contact;
//!
//! let a = Contact::new("Alice").with_phone("+1 (555) 123-4567");
//! let b = Contact::new("alice").with_phone("+15551234567");
//!
//! assert_eq!(a, b);
//! assert_eq!(a.signature(), b.signature());
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// One participant identity as seen in a source export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    name: String,
    #[serde(default)]
    phone_numbers: BTreeSet<String>,
    #[serde(default)]
    emails: BTreeSet<String>,
}

impl Contact {
    /// Creates a contact with only a display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            phone_numbers: BTreeSet::new(),
            emails: BTreeSet::new(),
        }
    }

    /// Creates a contact for a raw address (phone number or email) with no
    /// human name: the address itself becomes the display name.
    pub fn from_address(address: &str) -> Self {
        let address = address.trim();
        let contact = Self::new(address);
        if address.contains('@') {
            contact.with_email(address)
        } else if looks_like_phone(address) {
            contact.with_phone(address)
        } else {
            contact
        }
    }

    /// Returns a copy of this contact with one more phone number.
    ///
    /// Numbers are normalized with [`normalize_phone`]; empty results are ignored.
    #[must_use]
    pub fn with_phone(mut self, phone: &str) -> Self {
        let normalized = normalize_phone(phone);
        if !normalized.is_empty() {
            self.phone_numbers.insert(normalized);
        }
        self
    }

    /// Returns a copy of this contact with one more email address.
    #[must_use]
    pub fn with_email(mut self, email: &str) -> Self {
        let normalized = normalize_email(email);
        if !normalized.is_empty() {
            self.emails.insert(normalized);
        }
        self
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized phone numbers.
    pub fn phone_numbers(&self) -> &BTreeSet<String> {
        &self.phone_numbers
    }

    /// Normalized email addresses.
    pub fn emails(&self) -> &BTreeSet<String> {
        &self.emails
    }

    /// Returns `true` if `email` (any casing) belongs to this contact.
    pub fn has_email(&self, email: &str) -> bool {
        self.emails.contains(&normalize_email(email))
    }

    /// Returns `true` if the display name is just one of the contact's own
    /// addresses, i.e. the source supplied no human name.
    pub fn is_address_only(&self) -> bool {
        let folded = self.name.to_lowercase();
        self.emails.contains(&folded)
            || (!self.name.is_empty() && self.phone_numbers.contains(&normalize_phone(&self.name)))
    }

    /// Phone numbers reduced to bare digits, the form used for duplicate detection.
    pub fn phone_digits(&self) -> BTreeSet<String> {
        self.phone_numbers
            .iter()
            .map(|p| phone_digits(p))
            .filter(|d| !d.is_empty())
            .collect()
    }

    /// Stable identity signature of this contact.
    pub fn signature(&self) -> ContactSignature {
        ContactSignature::of(self)
    }
}

impl PartialEq for Contact {
    fn eq(&self, other: &Self) -> bool {
        self.signature() == other.signature()
    }
}

impl Eq for Contact {}

impl Hash for Contact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.signature().hash(state);
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        let addresses: Vec<&str> = self
            .phone_numbers
            .iter()
            .chain(self.emails.iter())
            .map(String::as_str)
            .filter(|a| !a.eq_ignore_ascii_case(&self.name))
            .collect();
        if !addresses.is_empty() {
            write!(f, " <{}>", addresses.join(", "))?;
        }
        Ok(())
    }
}

/// Normalized identity signature of a [`Contact`].
///
/// Format: `name|phone,phone|email,email` with the name case-folded and
/// whitespace-collapsed, and phones/emails in sorted order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactSignature(String);

impl ContactSignature {
    fn of(contact: &Contact) -> Self {
        let name = fold_name(&contact.name);
        let phones: Vec<&str> = contact.phone_numbers.iter().map(String::as_str).collect();
        let emails: Vec<&str> = contact.emails.iter().map(String::as_str).collect();
        Self(format!("{}|{}|{}", name, phones.join(","), emails.join(",")))
    }

    /// Returns the signature as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Contact> for ContactSignature {
    fn from(contact: &Contact) -> Self {
        Self::of(contact)
    }
}

/// Normalizes a phone number: keeps digits and a leading `+`, drops
/// spaces, dashes, dots, parentheses and everything else.
///
/// ```
/// use chatunify::contact::normalize_phone;
///
/// assert_eq!(normalize_phone("+1 (555) 123-4567"), "+15551234567");
/// assert_eq!(normalize_phone("555.123.4567"), "5551234567");
/// ```
pub fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut out = String::with_capacity(trimmed.len());
    if trimmed.starts_with('+') {
        out.push('+');
    }
    out.extend(trimmed.chars().filter(char::is_ascii_digit));
    if out == "+" { String::new() } else { out }
}

/// Phone number reduced to its digits only.
pub fn phone_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Normalizes an email address: trimmed, lowercased, optional `mailto:` removed.
pub fn normalize_email(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("mailto:")
        .or_else(|| trimmed.strip_prefix("MAILTO:"))
        .unwrap_or(trimmed);
    trimmed.to_lowercase()
}

/// Case-folds a display name and collapses runs of whitespace.
pub fn fold_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn looks_like_phone(s: &str) -> bool {
    let digits = s.chars().filter(char::is_ascii_digit).count();
    digits >= 3
        && s.chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')' | '.'))
}
