//! Epoch timestamp normalization.
//!
//! Exports encode instants as Unix seconds, milliseconds, or microseconds,
//! usually without saying which. [`EpochUnit::Auto`] resolves the ambiguity
//! between seconds and milliseconds with a single magnitude threshold:
//!
//! - `raw <= 10_000_000_000` is seconds since the epoch
//! - `raw >  10_000_000_000` is milliseconds since the epoch
//!
//! Read as seconds, the threshold is in the year 2286, so no realistic
//! timestamp is misclassified. Any source that would need seconds-based
//! instants past 2286 must tag its unit explicitly ([`EpochUnit::Seconds`]).
//!
//! Sources that document their unit use it directly; microsecond sources
//! are divided by 1,000 and then read as milliseconds.
//!
//! # Example
//!
//! ```
//! use chatunify::timestamp::{EpochUnit, to_utc};
//!
//! let a = to_utc(1_700_000_000, EpochUnit::Auto).unwrap();
//! let b = to_utc(1_700_000_000_000, EpochUnit::Auto).unwrap();
//! assert_eq!(a, b);
//! ```

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Raw values at or below this are seconds, above are milliseconds.
pub const EPOCH_SECONDS_THRESHOLD: i64 = 10_000_000_000;

/// Unit of a raw epoch value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpochUnit {
    /// Seconds or milliseconds, decided by [`EPOCH_SECONDS_THRESHOLD`].
    #[default]
    Auto,
    Seconds,
    Millis,
    Micros,
}

/// Converts a raw epoch value to a UTC instant.
///
/// Returns `None` when the value is outside chrono's representable range.
pub fn to_utc(raw: i64, unit: EpochUnit) -> Option<DateTime<Utc>> {
    match unit {
        EpochUnit::Auto if raw <= EPOCH_SECONDS_THRESHOLD => Utc.timestamp_opt(raw, 0).single(),
        EpochUnit::Auto | EpochUnit::Millis => Utc.timestamp_millis_opt(raw).single(),
        EpochUnit::Seconds => Utc.timestamp_opt(raw, 0).single(),
        EpochUnit::Micros => Utc.timestamp_millis_opt(raw / 1_000).single(),
    }
}

/// Shorthand for `to_utc(raw, EpochUnit::Auto)`.
pub fn normalize_epoch(raw: i64) -> Option<DateTime<Utc>> {
    to_utc(raw, EpochUnit::Auto)
}

/// Parses an epoch value stored as a decimal string (`"1700000000000"`).
///
/// Fractional values (`"1700000000.5"`) are truncated to their integer part.
pub fn parse_epoch_str(raw: &str, unit: EpochUnit) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    let integer = trimmed.split_once('.').map_or(trimmed, |(int, _)| int);
    integer.parse::<i64>().ok().and_then(|v| to_utc(v, unit))
}

/// Parses a human-readable date string into UTC.
///
/// Accepted shapes, tried in order:
/// - RFC 3339 / ISO 8601 with offset (`2024-01-15T10:30:00+02:00`)
/// - RFC 2822 (`Mon, 15 Jan 2024 10:30:00 +0000`)
/// - Group chat exports (`Monday, January 15, 2024 at 10:30:00 AM UTC`)
/// - Naive ISO (`2024-01-15 10:30:00`, `2024-01-15T10:30:00`), interpreted in
///   `naive_offset` so no naive local time leaves this function
pub fn parse_date_str(raw: &str, naive_offset: FixedOffset) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.to_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.to_utc());
    }

    // Group chat exports spell out the zone, usually "UTC".
    let normalized = s.replace('\u{202f}', " ");
    if let Some(local) = normalized.strip_suffix(" UTC") {
        for fmt in ["%A, %B %d, %Y at %I:%M:%S %p", "%B %d, %Y at %I:%M:%S %p"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(local, fmt) {
                return Some(naive.and_utc());
            }
        }
    }

    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return naive_offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.to_utc());
        }
    }

    None
}

/// Builds a fixed offset from minutes east of UTC, falling back to UTC for
/// out-of-range values.
pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
}
