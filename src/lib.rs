// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava-Sync: incremental Strava activity sync into SQLite
//!
//! This crate pulls new activities from the Strava API page by page,
//! normalizes them into a flat row shape and commits them together with a
//! sync watermark, then serves the stored rows to a dashboard.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::SqliteStore;
use services::SyncService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: SqliteStore,
    pub sync_service: SyncService,
}
