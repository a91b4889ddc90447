//! Database layer (SQLite via sqlx).

pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SyncError;
use crate::models::{NormalizedActivity, SyncWatermark};

pub use sqlite::SqliteStore;

/// Durable destination of a sync run.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    /// Current watermark, or the epoch sentinel if nothing was ever committed.
    async fn load_watermark(&self) -> Result<SyncWatermark, SyncError>;

    /// Whether an activity with this id is already stored.
    async fn contains(&self, id: i64) -> Result<bool, SyncError>;

    /// Store every record and then advance the watermark, as one unit.
    ///
    /// On error nothing from this call is visible.
    async fn commit(
        &self,
        records: &[NormalizedActivity],
        new_watermark: DateTime<Utc>,
    ) -> Result<(), SyncError>;
}
