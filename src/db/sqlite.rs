// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite-backed activity store.
//!
//! Provides:
//! - The sync sink (watermark read, atomic batch commit)
//! - Read-only queries for the dashboard API

use std::collections::HashSet;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::db::ActivitySink;
use crate::error::SyncError;
use crate::models::{NormalizedActivity, SyncWatermark};
use crate::services::normalize::TARGET_FIELDS;
use crate::time_utils::{format_utc_rfc3339, parse_stored_timestamp};

/// Rows per multi-row INSERT. 25 binds per row keeps this far below
/// SQLite's bind-parameter limit.
const DEFAULT_INSERT_CHUNK_SIZE: usize = 500;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS activities (
  id INTEGER PRIMARY KEY NOT NULL,
  name TEXT NULL,
  distance REAL NULL,
  moving_time INTEGER NULL,
  elapsed_time INTEGER NULL,
  total_elevation_gain REAL NULL,
  type TEXT NULL,
  workout_type INTEGER NULL,
  location_country TEXT NULL,
  achievement_count INTEGER NULL,
  kudos_count INTEGER NULL,
  summary_polyline TEXT NULL,
  start_lat REAL NULL,
  start_lng REAL NULL,
  end_lat REAL NULL,
  end_lng REAL NULL,
  comment_count INTEGER NULL,
  athlete_count INTEGER NULL,
  average_speed REAL NULL,
  max_speed REAL NULL,
  average_cadence REAL NULL,
  average_temp REAL NULL,
  average_heartrate REAL NULL,
  max_heartrate REAL NULL,
  start_date TEXT NULL
);
CREATE INDEX IF NOT EXISTS activities_start_date_idx ON activities(start_date DESC);

CREATE TABLE IF NOT EXISTS sync_watermark (
  last_updated TEXT NOT NULL
);
"#;

/// SQLite activity store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    insert_chunk_size: usize,
}

impl SqliteStore {
    /// Connect to a SQLite database URL and apply the schema.
    pub async fn connect(url: &str) -> Result<Self, SyncError> {
        if url.contains(":memory:") {
            return Self::in_memory().await;
        }

        let opts = SqliteConnectOptions::from_str(url)?
            .journal_mode(SqliteJournalMode::Wal)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        tracing::info!(url, "Connected to SQLite activity store");
        Self::with_pool(pool).await
    }

    /// Private in-memory database (tests, dry runs).
    ///
    /// Each SQLite connection to `:memory:` is its own database, so the pool
    /// holds exactly one connection that never expires.
    pub async fn in_memory() -> Result<Self, SyncError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, SyncError> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self {
            pool,
            insert_chunk_size: DEFAULT_INSERT_CHUNK_SIZE,
        })
    }

    /// Override the multi-row INSERT size.
    pub fn with_insert_chunk_size(mut self, rows: usize) -> Self {
        self.insert_chunk_size = rows.max(1);
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ─── Dashboard Queries ───────────────────────────────────────

    /// Activities, newest first.
    pub async fn list_activities(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<NormalizedActivity>, SyncError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM activities ORDER BY start_date DESC, id DESC LIMIT ?1 OFFSET ?2",
            TARGET_FIELDS.join(", ")
        ))
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(activity_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn get_activity(&self, id: i64) -> Result<Option<NormalizedActivity>, SyncError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM activities WHERE id = ?1",
            TARGET_FIELDS.join(", ")
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(activity_from_row)
            .transpose()
            .map_err(SyncError::from)
    }

    /// Watermark of the last successful run, for display.
    pub async fn current_watermark(&self) -> Result<SyncWatermark, SyncError> {
        self.load_watermark().await
    }

    pub async fn count_activities(&self) -> Result<u64, SyncError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM activities")
            .fetch_one(&self.pool)
            .await?
            .try_get("n")?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl ActivitySink for SqliteStore {
    async fn load_watermark(&self) -> Result<SyncWatermark, SyncError> {
        let raw: String =
            sqlx::query("SELECT COALESCE(MAX(last_updated), ?1) AS last_updated FROM sync_watermark")
                .bind(SyncWatermark::EPOCH_SENTINEL)
                .fetch_one(&self.pool)
                .await?
                .try_get("last_updated")?;

        parse_stored_timestamp(&raw)
            .map(SyncWatermark::new)
            .ok_or_else(|| SyncError::Persistence(format!("unparseable watermark {:?}", raw)))
    }

    async fn contains(&self, id: i64) -> Result<bool, SyncError> {
        let row = sqlx::query("SELECT 1 FROM activities WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn commit(
        &self,
        records: &[NormalizedActivity],
        new_watermark: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        let ids = batch_ids(records)?;

        // Dropping `tx` on any early return rolls everything back.
        let mut tx = self.pool.begin().await?;

        for (chunk, chunk_ids) in records
            .chunks(self.insert_chunk_size)
            .zip(ids.chunks(self.insert_chunk_size))
        {
            let mut existing = QueryBuilder::<Sqlite>::new("SELECT id FROM activities WHERE id IN (");
            let mut separated = existing.separated(", ");
            for id in chunk_ids {
                separated.push_bind(*id);
            }
            separated.push_unseparated(") LIMIT 1");

            if let Some(row) = existing.build().fetch_optional(&mut *tx).await? {
                let id: i64 = row.try_get("id")?;
                tracing::error!(activity_id = id, "Activity already stored, aborting commit");
                return Err(SyncError::DuplicateKey(id.to_string()));
            }

            let mut insert = QueryBuilder::<Sqlite>::new(format!(
                "INSERT INTO activities ({}) ",
                TARGET_FIELDS.join(", ")
            ));
            insert.push_values(chunk, |mut row, a| {
                row.push_bind(a.id)
                    .push_bind(a.name.as_deref())
                    .push_bind(a.distance)
                    .push_bind(a.moving_time)
                    .push_bind(a.elapsed_time)
                    .push_bind(a.total_elevation_gain)
                    .push_bind(a.activity_type.as_deref())
                    .push_bind(a.workout_type)
                    .push_bind(a.location_country.as_deref())
                    .push_bind(a.achievement_count)
                    .push_bind(a.kudos_count)
                    .push_bind(a.summary_polyline.as_deref())
                    .push_bind(a.start_lat)
                    .push_bind(a.start_lng)
                    .push_bind(a.end_lat)
                    .push_bind(a.end_lng)
                    .push_bind(a.comment_count)
                    .push_bind(a.athlete_count)
                    .push_bind(a.average_speed)
                    .push_bind(a.max_speed)
                    .push_bind(a.average_cadence)
                    .push_bind(a.average_temp)
                    .push_bind(a.average_heartrate)
                    .push_bind(a.max_heartrate)
                    .push_bind(a.start_date.map(format_utc_rfc3339));
            });
            insert.build().execute(&mut *tx).await?;
        }

        sqlx::query("INSERT INTO sync_watermark (last_updated) VALUES (?1)")
            .bind(format_utc_rfc3339(new_watermark))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            records = records.len(),
            watermark = %format_utc_rfc3339(new_watermark),
            "Committed activities and watermark"
        );
        Ok(())
    }
}

/// Collect the batch's ids, rejecting missing or repeated ones before any
/// write happens.
fn batch_ids(records: &[NormalizedActivity]) -> Result<Vec<i64>, SyncError> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .iter()
        .map(|a| {
            let id = a.id.ok_or_else(|| {
                SyncError::Persistence("activity without id cannot be stored".to_string())
            })?;
            if !seen.insert(id) {
                return Err(SyncError::DuplicateKey(format!("{} (repeated in batch)", id)));
            }
            Ok(id)
        })
        .collect()
}

fn activity_from_row(row: &SqliteRow) -> Result<NormalizedActivity, sqlx::Error> {
    let start_date: Option<String> = row.try_get("start_date")?;

    Ok(NormalizedActivity {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        distance: row.try_get("distance")?,
        moving_time: row.try_get("moving_time")?,
        elapsed_time: row.try_get("elapsed_time")?,
        total_elevation_gain: row.try_get("total_elevation_gain")?,
        activity_type: row.try_get("type")?,
        workout_type: row.try_get("workout_type")?,
        location_country: row.try_get("location_country")?,
        achievement_count: row.try_get("achievement_count")?,
        kudos_count: row.try_get("kudos_count")?,
        summary_polyline: row.try_get("summary_polyline")?,
        start_lat: row.try_get("start_lat")?,
        start_lng: row.try_get("start_lng")?,
        end_lat: row.try_get("end_lat")?,
        end_lng: row.try_get("end_lng")?,
        comment_count: row.try_get("comment_count")?,
        athlete_count: row.try_get("athlete_count")?,
        average_speed: row.try_get("average_speed")?,
        max_speed: row.try_get("max_speed")?,
        average_cadence: row.try_get("average_cadence")?,
        average_temp: row.try_get("average_temp")?,
        average_heartrate: row.try_get("average_heartrate")?,
        max_heartrate: row.try_get("max_heartrate")?,
        start_date: start_date.as_deref().and_then(parse_stored_timestamp),
    })
}
