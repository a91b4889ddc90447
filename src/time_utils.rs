// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Format Strava uses for `start_date` (always UTC).
pub const STRAVA_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
///
/// Output is fixed-width for four-digit years, so stored values sort
/// lexically in chronological order.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a Strava `start_date` string. Returns `None` on any deviation from
/// the fixed format.
pub fn parse_strava_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, STRAVA_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse a timestamp read back from the store.
pub fn parse_stored_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| parse_strava_date(raw))
}
