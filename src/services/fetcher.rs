// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rate-limited page fetching.
//!
//! `RateLimitedFetcher` wraps any `ActivitySource` with Strava's backoff
//! policy: cool down once and retry the same page once, and pause
//! proactively every N pages before the quota runs out.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::SyncSettings;
use crate::error::SyncError;
use crate::models::RawActivity;
use crate::services::strava::StravaClient;

/// Something that can hand out pages of raw activities, newest first.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Fetch page `page` (1-indexed). An empty page means end of data.
    async fn fetch_page(&self, page: u32) -> Result<Vec<RawActivity>, SyncError>;
}

/// The live Strava API, authenticated for a single run.
pub struct StravaSource {
    client: StravaClient,
    access_token: String,
    per_page: u32,
}

impl StravaSource {
    pub fn new(client: StravaClient, access_token: String, per_page: u32) -> Self {
        Self {
            client,
            access_token,
            per_page,
        }
    }
}

#[async_trait]
impl ActivitySource for StravaSource {
    async fn fetch_page(&self, page: u32) -> Result<Vec<RawActivity>, SyncError> {
        self.client
            .list_activities_page(&self.access_token, page, self.per_page)
            .await
    }
}

/// Result of one fetcher call.
#[derive(Debug)]
pub enum PageFetch {
    Records(Vec<RawActivity>),
    EndOfData,
}

/// Applies the cooldown/retry policy around an `ActivitySource`.
pub struct RateLimitedFetcher<S> {
    source: S,
    cooldown: Duration,
    pause_every_pages: u32,
    cooldowns_taken: u32,
}

impl<S: ActivitySource> RateLimitedFetcher<S> {
    pub fn new(source: S, settings: &SyncSettings) -> Self {
        Self {
            source,
            cooldown: settings.cooldown,
            pause_every_pages: settings.pause_every_pages,
            cooldowns_taken: 0,
        }
    }

    /// Fetch one page.
    ///
    /// A retryable failure (rate limit or malformed page) costs one cooldown
    /// and one retry of the same page; a second failure is returned as is.
    pub async fn fetch(&mut self, page: u32) -> Result<PageFetch, SyncError> {
        if self.pause_every_pages > 0 && page % self.pause_every_pages == 0 {
            tracing::info!(
                page,
                cooldown_secs = self.cooldown.as_secs(),
                "Proactive pause to stay under Strava rate limit"
            );
            self.cool_down().await;
        }

        let records = match self.source.fetch_page(page).await {
            Ok(records) => records,
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    page,
                    error = %e,
                    cooldown_secs = self.cooldown.as_secs(),
                    "Strava rate limit hit, cooling down before retry"
                );
                self.cool_down().await;
                self.source.fetch_page(page).await.inspect_err(|e| {
                    tracing::error!(page, error = %e, "Retry after cooldown failed");
                })?
            }
            Err(e) => return Err(e),
        };

        if records.is_empty() {
            tracing::debug!(page, "Empty page, no more activities");
            Ok(PageFetch::EndOfData)
        } else {
            Ok(PageFetch::Records(records))
        }
    }

    /// Number of cooldowns (reactive and proactive) taken so far.
    pub fn cooldowns_taken(&self) -> u32 {
        self.cooldowns_taken
    }

    async fn cool_down(&mut self) {
        self.cooldowns_taken += 1;
        if !self.cooldown.is_zero() {
            tokio::time::sleep(self.cooldown).await;
        }
    }
}
