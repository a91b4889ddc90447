// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Task routes for triggering sync runs.
//!
//! Meant for a scheduler (cron, Cloud Scheduler) rather than users. The run
//! continues in the background after the response, so cooldowns never
//! outlive the caller's timeout. An overlapping trigger gets 409.

use crate::error::Result;
use crate::AppState;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/tasks/sync", post(run_sync))
}

#[derive(Serialize)]
pub struct TriggerResponse {
    pub status: &'static str,
}

/// Start one incremental sync and return immediately.
async fn run_sync(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<TriggerResponse>)> {
    let permit = state.sync_service.begin_run()?;
    let service = state.sync_service.clone();

    tracing::info!("Sync triggered via task endpoint");
    tokio::spawn(async move {
        // Outcome is logged by the orchestrator; this covers token failures too.
        match service.run_with(permit).await {
            Ok(report) => tracing::info!(synced = report.synced, "Triggered sync finished"),
            Err(e) => tracing::error!(error = %e, "Triggered sync failed"),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerResponse { status: "accepted" }),
    ))
}
