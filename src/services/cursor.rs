// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Incremental cursor: decides which fetched records are new.

use chrono::{DateTime, Utc};

use crate::models::SyncWatermark;

/// How a fetched record relates to the watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorDecision {
    /// Started strictly after the watermark.
    New,
    /// At or before the watermark: already synced.
    Covered,
    /// No usable `start_date`; cannot be compared.
    Unranked,
}

/// Holds the watermark read at the start of a run.
#[derive(Debug, Clone, Copy)]
pub struct IncrementalCursor {
    watermark: SyncWatermark,
}

impl IncrementalCursor {
    pub fn new(watermark: SyncWatermark) -> Self {
        Self { watermark }
    }

    pub fn watermark(&self) -> SyncWatermark {
        self.watermark
    }

    /// True only for records started strictly after the watermark.
    pub fn is_new(&self, start_date: DateTime<Utc>) -> bool {
        start_date > self.watermark.timestamp()
    }

    pub fn classify(&self, start_date: Option<DateTime<Utc>>) -> CursorDecision {
        match start_date {
            Some(date) if self.is_new(date) => CursorDecision::New,
            Some(_) => CursorDecision::Covered,
            None => CursorDecision::Unranked,
        }
    }
}
