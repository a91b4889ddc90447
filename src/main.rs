// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava-Sync
//!
//! `strava-sync sync` runs one incremental sync and exits (for cron);
//! `strava-sync serve` exposes the stored activities and a sync trigger.

use anyhow::Context;
use std::sync::Arc;
use strava_sync::{config::Config, db::SqliteStore, services::SyncService, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "sync".to_string());

    let config = Config::from_env().context("Failed to load configuration")?;

    let store = SqliteStore::connect(&config.database_url)
        .await
        .context("Failed to open activity store")?;

    let sync_service = SyncService::new(&config, store.clone());

    match mode.as_str() {
        "sync" => {
            let report = sync_service.run_once().await.context("Sync run failed")?;
            tracing::info!(
                synced = report.synced,
                watermark = %report.watermark_after,
                "Done"
            );
            Ok(())
        }
        "serve" => serve(config, store, sync_service).await,
        other => anyhow::bail!("Unknown mode {:?} (expected \"sync\" or \"serve\")", other),
    }
}

async fn serve(config: Config, store: SqliteStore, sync_service: SyncService) -> anyhow::Result<()> {
    let port = config.port;
    let state = Arc::new(AppState {
        config,
        store,
        sync_service,
    });

    let app = strava_sync::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("strava_sync=debug,info")),
        )
        .with(format)
        .init();
}
