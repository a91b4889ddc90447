// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use serde_json::{json, Value};
use std::sync::Arc;
use strava_sync::config::{Config, SyncSettings};
use strava_sync::db::SqliteStore;
use strava_sync::models::RawActivity;
use strava_sync::routes::create_router;
use strava_sync::services::SyncService;
use strava_sync::AppState;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[allow(dead_code)]
pub const TEST_ACCESS_TOKEN: &str = "test-access-token";

/// Matches `Config::default().sync_trigger_token`.
#[allow(dead_code)]
pub const TEST_TRIGGER_TOKEN: &str = "test-trigger-token";

/// Realistic summary activity as returned by `GET /athlete/activities`.
#[allow(dead_code)]
pub fn fixture_activity() -> Value {
    serde_json::from_str(include_str!("../fixtures/activity_summary.json"))
        .expect("fixture should be valid JSON")
}

/// Minimal activity with just an id and a start date.
#[allow(dead_code)]
pub fn activity(id: i64, start_date: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Activity {}", id),
        "type": "Run",
        "distance": 5000.0,
        "start_date": start_date,
        "start_latlng": [51.5, -0.1],
        "end_latlng": [51.51, -0.11],
        "map": { "id": format!("a{}", id), "summary_polyline": "_p~iF~ps|U_ulLnnqC_mqNvxq`@" }
    })
}

#[allow(dead_code)]
pub fn raw(value: Value) -> RawActivity {
    RawActivity::try_from(value).expect("activity fixture must be an object")
}

/// Config pointing at a mock Strava server with no cooldown waits.
#[allow(dead_code)]
pub fn test_config(server: &MockServer) -> Config {
    Config {
        api_base_url: format!("{}/api/v3", server.uri()),
        token_url: format!("{}/oauth/token", server.uri()),
        sync: SyncSettings::immediate(),
        ..Config::default()
    }
}

/// Create an in-memory store with the schema applied.
#[allow(dead_code)]
pub async fn test_store() -> SqliteStore {
    SqliteStore::in_memory()
        .await
        .expect("Failed to open in-memory store")
}

/// Accept the refresh-token exchange.
#[allow(dead_code)]
pub async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "access_token": TEST_ACCESS_TOKEN,
            "refresh_token": "rotated-refresh-token",
            "expires_at": 1_893_456_000,
            "expires_in": 21600
        })))
        .mount(server)
        .await;
}

/// Serve `records` as activity page `page` (one record per page by default).
#[allow(dead_code)]
pub async fn mount_page(server: &MockServer, page: u32, records: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/api/v3/athlete/activities"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(records)))
        .mount(server)
        .await;
}

/// Serve a descending list of activities one per page, then an empty page.
#[allow(dead_code)]
pub async fn mount_feed(server: &MockServer, records: Vec<Value>) {
    let count = records.len() as u32;
    for (i, record) in records.into_iter().enumerate() {
        mount_page(server, i as u32 + 1, vec![record]).await;
    }
    mount_page(server, count + 1, vec![]).await;
}

/// Create a test app backed by `store`, with Strava pointed at `server`.
#[allow(dead_code)]
pub fn create_test_app(server: &MockServer, store: SqliteStore) -> (axum::Router, Arc<AppState>) {
    let config = test_config(server);
    let sync_service = SyncService::new(&config, store.clone());

    let state = Arc::new(AppState {
        config,
        store,
        sync_service,
    });

    (create_router(state.clone()), state)
}
