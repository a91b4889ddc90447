// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON export of a committed batch.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::models::NormalizedActivity;

/// Write `records` to `{dir}/{YYYY_MM_DD}_export_file.json`, creating the
/// directory if needed. A later run on the same day overwrites the file.
pub async fn export_batch(
    dir: &Path,
    records: &[NormalizedActivity],
    at: DateTime<Utc>,
) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let path = dir.join(format!("{}_export_file.json", at.format("%Y_%m_%d")));
    let json = serde_json::to_vec_pretty(records)?;
    tokio::fs::write(&path, json).await?;

    tracing::info!(path = %path.display(), records = records.len(), "Exported synced batch");
    Ok(path)
}
