// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only API routes consumed by the dashboard.

use crate::error::{AppError, Result};
use crate::models::{NormalizedActivity, SyncWatermark};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Google's encoded polyline precision used by Strava.
const POLYLINE_PRECISION: u32 = 5;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", get(get_activities))
        .route("/api/activities/{id}", get(get_activity))
        .route("/api/activities/{id}/route", get(get_activity_route))
}

// ─── Activities ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ActivitiesQuery {
    /// Pagination: page number (1-indexed)
    #[serde(default = "default_page")]
    page: u32,
    /// Pagination: items per page
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_page() -> u32 {
    1
}
fn default_per_page() -> u32 {
    50
}

const MAX_PER_PAGE: u32 = 100;

#[derive(Serialize)]
pub struct ActivitiesResponse {
    pub activities: Vec<NormalizedActivity>,
    pub page: u32,
    pub per_page: u32,
    /// Total number of stored activities.
    pub total: u64,
    /// When the store was last synced
    pub last_synced: SyncWatermark,
}

/// List stored activities, newest first.
async fn get_activities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActivitiesQuery>,
) -> Result<Json<ActivitiesResponse>> {
    if params.page == 0 {
        return Err(AppError::BadRequest("page must be >= 1".to_string()));
    }
    if params.per_page == 0 {
        return Err(AppError::BadRequest("per_page must be >= 1".to_string()));
    }

    let per_page = params.per_page.min(MAX_PER_PAGE);
    let offset = (params.page - 1).saturating_mul(per_page);

    tracing::debug!(page = params.page, per_page, "Fetching activities");

    let activities = state.store.list_activities(per_page, offset).await?;
    let total = state.store.count_activities().await?;
    let last_synced = state.store.current_watermark().await?;

    Ok(Json(ActivitiesResponse {
        activities,
        page: params.page,
        per_page,
        total,
        last_synced,
    }))
}

async fn get_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<NormalizedActivity>> {
    state
        .store
        .get_activity(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Activity {}", id)))
}

// ─── Routes ──────────────────────────────────────────────────

#[derive(Serialize)]
pub struct RouteResponse {
    pub id: i64,
    /// `[lat, lng]` pairs along the summary polyline
    pub points: Vec<[f64; 2]>,
}

/// Decode an activity's summary polyline for map rendering.
async fn get_activity_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<RouteResponse>> {
    let activity = state
        .store
        .get_activity(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Activity {}", id)))?;

    let encoded = activity
        .summary_polyline
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::NotFound(format!("Route for activity {}", id)))?;

    Ok(Json(RouteResponse {
        id,
        points: decode_route(&encoded)?,
    }))
}

fn decode_route(encoded: &str) -> Result<Vec<[f64; 2]>> {
    let line = polyline::decode_polyline(encoded, POLYLINE_PRECISION)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Polyline error: {}", e)))?;

    // geo coordinates are (x = lng, y = lat)
    Ok(line.0.iter().map(|c| [c.y, c.x]).collect())
}
