// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - sync pipeline layer.

pub mod cursor;
pub mod export;
pub mod fetcher;
pub mod normalize;
pub mod strava;
pub mod sync;

pub use cursor::{CursorDecision, IncrementalCursor};
pub use fetcher::{ActivitySource, PageFetch, RateLimitedFetcher, StravaSource};
pub use normalize::normalize;
pub use strava::StravaClient;
pub use sync::{RunPermit, SyncOrchestrator, SyncReport, SyncService, SyncState};
