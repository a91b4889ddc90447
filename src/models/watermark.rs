// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Incremental sync watermark.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::fmt;

use crate::time_utils::format_utc_rfc3339;

/// Boundary between already-synced and not-yet-synced activities.
///
/// Read once when a run starts and superseded (never edited) when a run
/// commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SyncWatermark(DateTime<Utc>);

impl SyncWatermark {
    /// Stored text of the "never synced" sentinel.
    pub const EPOCH_SENTINEL: &'static str = "1900-01-01T00:00:00Z";

    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    /// Watermark used when no run has ever committed.
    pub fn epoch() -> Self {
        Self(
            Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        )
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for SyncWatermark {
    fn default() -> Self {
        Self::epoch()
    }
}

impl fmt::Display for SyncWatermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_utc_rfc3339(self.0))
    }
}
