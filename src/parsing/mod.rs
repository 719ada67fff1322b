//! Raw-schema types and per-record mapping for every source.
//!
//! Each submodule owns one export schema: the raw structures it
//! deserializes into and the functions that map one raw record to a
//! [`Message`](crate::Message). File access, detection, and corpus-level
//! passes (identity resolution) live in [`importers`](crate::importers).

#[cfg(feature = "sms")]
pub mod sms;

#[cfg(feature = "social")]
pub mod social;

#[cfg(feature = "groupchat")]
pub mod groupchat;

#[cfg(feature = "legacy")]
pub mod legacy;

#[cfg(feature = "mail")]
pub mod mail;

// Re-export commonly used items
#[cfg(feature = "social")]
pub use social::fix_mojibake_encoding;

#[cfg(feature = "mail")]
pub use mail::{normalize_subject, split_mbox, strip_html};
