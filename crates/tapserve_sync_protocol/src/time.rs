//! Timestamp helpers.
//!
//! Every timestamp written by this workspace uses the fixed
//! `YYYY-MM-DDTHH:MM:SS.mmmZ` UTC form so that plain string comparison
//! orders them chronologically. Servers that emit other offsets break that
//! ordering; the pull phase compares the raw strings regardless.

use chrono::{DateTime, SecondsFormat, Utc};

/// Formats a UTC instant as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn format_iso(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Returns the current time in the canonical ISO form.
pub fn now_iso() -> String {
    format_iso(Utc::now())
}
