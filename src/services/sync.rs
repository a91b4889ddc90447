// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Incremental sync orchestration.
//!
//! Handles the core workflow:
//! 1. Load the watermark from the store
//! 2. Fetch pages newest-first through the rate-limited fetcher
//! 3. Normalize records until the first already-synced one
//! 4. Commit the batch and the new watermark in one transaction
//!
//! Nothing is written before step 4, so a run that fails (or is killed)
//! anywhere earlier leaves the store exactly as it found it.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::{Config, SyncSettings};
use crate::db::{ActivitySink, SqliteStore};
use crate::error::SyncError;
use crate::models::{NormalizedActivity, RawActivity, SyncWatermark};
use crate::services::cursor::{CursorDecision, IncrementalCursor};
use crate::services::export::export_batch;
use crate::services::fetcher::{ActivitySource, PageFetch, RateLimitedFetcher, StravaSource};
use crate::services::normalize::{normalize, parse_start_date};
use crate::services::strava::StravaClient;
use crate::time_utils::format_utc_rfc3339;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    FetchingPage { page: u32 },
    EvaluatingRecord { page: u32 },
    Stopping,
    Persisting,
    Done,
    Failed,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Records committed by this run
    pub synced: usize,
    /// Synced records that had no usable `start_date`
    pub unranked: usize,
    /// Records dropped because they carried no `id`
    pub skipped_without_id: usize,
    /// Non-empty pages fetched
    pub pages_fetched: u32,
    pub started_at: DateTime<Utc>,
    pub watermark_before: SyncWatermark,
    pub watermark_after: SyncWatermark,
}

/// What evaluating one page tells the fetch loop.
#[derive(Debug, PartialEq, Eq)]
enum PageOutcome {
    Continue,
    Stop,
}

/// Records accumulated so far in a run.
#[derive(Default)]
struct Batch {
    records: Vec<NormalizedActivity>,
    ids: HashSet<i64>,
    unranked: usize,
    skipped_without_id: usize,
}

/// Drives one sync run from watermark to commit.
pub struct SyncOrchestrator<S, K> {
    fetcher: RateLimitedFetcher<S>,
    sink: K,
    settings: SyncSettings,
    state: SyncState,
}

impl<S: ActivitySource, K: ActivitySink> SyncOrchestrator<S, K> {
    pub fn new(source: S, sink: K, settings: SyncSettings) -> Self {
        Self {
            fetcher: RateLimitedFetcher::new(source, &settings),
            sink,
            settings,
            state: SyncState::Idle,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Run one sync. The new watermark is the wall-clock time at run start.
    pub async fn run(&mut self) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();

        match self.execute(started_at).await {
            Ok(report) => {
                self.transition(SyncState::Done);
                tracing::info!(
                    synced = report.synced,
                    unranked = report.unranked,
                    skipped_without_id = report.skipped_without_id,
                    pages = report.pages_fetched,
                    watermark = %report.watermark_after,
                    "Sync run complete"
                );
                Ok(report)
            }
            Err(e) => {
                self.transition(SyncState::Failed);
                tracing::error!(error = %e, "Sync run failed, batch discarded");
                Err(e)
            }
        }
    }

    async fn execute(&mut self, started_at: DateTime<Utc>) -> Result<SyncReport, SyncError> {
        self.transition(SyncState::Idle);
        let watermark_before = self.sink.load_watermark().await?;
        let cursor = IncrementalCursor::new(watermark_before);
        tracing::info!(watermark = %cursor.watermark(), "Starting incremental sync");

        let mut batch = Batch::default();
        let mut pages_fetched = 0;
        let mut page = 1;

        loop {
            self.transition(SyncState::FetchingPage { page });
            let records = match self.fetcher.fetch(page).await? {
                PageFetch::Records(records) => records,
                PageFetch::EndOfData => break,
            };
            pages_fetched += 1;

            self.transition(SyncState::EvaluatingRecord { page });
            if self.evaluate_page(&cursor, records, &mut batch).await? == PageOutcome::Stop {
                self.transition(SyncState::Stopping);
                break;
            }
            page += 1;
        }

        self.transition(SyncState::Persisting);
        let watermark_after = if batch.records.is_empty() {
            tracing::info!("No new activities, watermark unchanged");
            watermark_before
        } else {
            self.sink.commit(&batch.records, started_at).await?;
            self.export(&batch.records, started_at).await;
            self.sink.load_watermark().await?
        };

        Ok(SyncReport {
            synced: batch.records.len(),
            unranked: batch.unranked,
            skipped_without_id: batch.skipped_without_id,
            pages_fetched,
            started_at,
            watermark_before,
            watermark_after,
        })
    }

    /// Apply the cursor to every record of a page, newest first.
    async fn evaluate_page(
        &self,
        cursor: &IncrementalCursor,
        records: Vec<RawActivity>,
        batch: &mut Batch,
    ) -> Result<PageOutcome, SyncError> {
        for raw in records {
            let decision = cursor.classify(parse_start_date(&raw));

            if decision == CursorDecision::Covered {
                if self.settings.assume_descending {
                    // Everything after this record is older still.
                    tracing::debug!(
                        start_date = raw.start_date_raw().unwrap_or_default(),
                        "Reached already-synced activity"
                    );
                    return Ok(PageOutcome::Stop);
                }
                continue;
            }

            let activity = normalize(&raw);
            let Some(id) = activity.id else {
                tracing::warn!("Activity without id skipped");
                batch.skipped_without_id += 1;
                continue;
            };

            if batch.ids.contains(&id) {
                // Pages shift when an activity is uploaded mid-run.
                tracing::debug!(activity_id = id, "Activity already in this batch");
                continue;
            }

            if decision == CursorDecision::Unranked {
                if self.sink.contains(id).await? {
                    tracing::debug!(activity_id = id, "Unranked activity already stored");
                    continue;
                }
                tracing::warn!(
                    activity_id = id,
                    start_date = ?raw.start_date_raw(),
                    "Activity has no usable start_date, syncing without cursor ranking"
                );
                batch.unranked += 1;
            }

            batch.ids.insert(id);
            batch.records.push(activity);
        }

        Ok(PageOutcome::Continue)
    }

    async fn export(&self, records: &[NormalizedActivity], at: DateTime<Utc>) {
        let Some(dir) = &self.settings.export_dir else {
            return;
        };
        if let Err(e) = export_batch(dir, records, at).await {
            tracing::warn!(error = %e, dir = %dir.display(), "Batch export failed");
        }
    }

    fn transition(&mut self, next: SyncState) {
        tracing::debug!(from = ?self.state, to = ?next, "Sync state");
        self.state = next;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SyncService - one run at a time against the live API
// ─────────────────────────────────────────────────────────────────────────────

/// Runs syncs against Strava and the SQLite store, one at a time.
#[derive(Clone)]
pub struct SyncService {
    client: StravaClient,
    store: SqliteStore,
    refresh_token: String,
    settings: SyncSettings,
    /// Held for the whole run; a second caller gets `AlreadyRunning`.
    run_lock: Arc<Mutex<()>>,
}

/// Exclusive right to perform one sync run. Released on drop.
pub struct RunPermit {
    _guard: OwnedMutexGuard<()>,
}

impl SyncService {
    pub fn new(config: &Config, store: SqliteStore) -> Self {
        Self {
            client: StravaClient::from_config(config),
            store,
            refresh_token: config.strava_refresh_token.clone(),
            settings: config.sync.clone(),
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Claim the run lock without waiting.
    pub fn begin_run(&self) -> Result<RunPermit, SyncError> {
        let guard = self.run_lock.clone().try_lock_owned().map_err(|_| {
            tracing::warn!("Sync requested while another run is in progress");
            SyncError::AlreadyRunning
        })?;
        Ok(RunPermit { _guard: guard })
    }

    /// Exchange credentials and perform one incremental sync.
    pub async fn run_once(&self) -> Result<SyncReport, SyncError> {
        let permit = self.begin_run()?;
        self.run_with(permit).await
    }

    /// Perform one sync under an already claimed permit.
    pub async fn run_with(&self, permit: RunPermit) -> Result<SyncReport, SyncError> {
        let token = self
            .client
            .exchange_refresh_token(&self.refresh_token)
            .await?;
        if let Some(expires_at) = token.expires_at.and_then(|ts| DateTime::from_timestamp(ts, 0)) {
            tracing::debug!(expires_at = %format_utc_rfc3339(expires_at), "Access token acquired");
        }
        if token
            .refresh_token
            .as_deref()
            .is_some_and(|rotated| rotated != self.refresh_token)
        {
            tracing::warn!("Strava rotated the refresh token, update STRAVA_REFRESH_TOKEN");
        }

        let source = StravaSource::new(
            self.client.clone(),
            token.access_token,
            self.settings.per_page,
        );
        let report = SyncOrchestrator::new(source, self.store.clone(), self.settings.clone())
            .run()
            .await;
        drop(permit);
        report
    }
}
