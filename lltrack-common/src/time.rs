//! Timestamp utilities
//!
//! All persisted timestamps are UTC RFC 3339 strings with a fixed number of
//! fractional digits, so lexical order in SQL matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage
pub fn to_db_string(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time formatted for storage
pub fn now_db_string() -> String {
    to_db_string(now())
}
