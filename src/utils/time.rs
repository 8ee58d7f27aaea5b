//! Time and timestamp utilities
//!
//! Timestamps are RFC3339 strings with fixed millisecond precision in UTC
//! (`2026-08-26T10:15:30.123Z`). The fixed width makes lexicographic string
//! comparison equivalent to chronological comparison, which the store's
//! time-range filters rely on.

use chrono::{SecondsFormat, Utc};

/// Current UTC time as an RFC3339 string with millisecond precision.
pub fn now_rfc3339_millis() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current Unix timestamp in milliseconds.
pub fn current_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}
