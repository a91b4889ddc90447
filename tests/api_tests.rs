// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP surface tests: dashboard queries and the sync trigger.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use strava_sync::db::ActivitySink;
use strava_sync::routes::create_router;
use strava_sync::services::{normalize, SyncService};
use strava_sync::AppState;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{
    activity, create_test_app, fixture_activity, mount_feed, mount_page, mount_token, raw,
    test_config, test_store, TEST_TRIGGER_TOKEN,
};

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

/// App whose store already holds ids 1..=n, newest id first.
async fn app_with_activities(n: i64) -> Router {
    let server = MockServer::start().await;
    let store = test_store().await;
    let records: Vec<_> = (1..=n)
        .map(|id| normalize(&raw(activity(id, &format!("2024-01-{:02}T08:00:00Z", id)))))
        .collect();
    if !records.is_empty() {
        store.commit(&records, chrono::Utc::now()).await.unwrap();
    }
    create_test_app(&server, store).0
}

#[tokio::test]
async fn test_health_check() {
    let app = app_with_activities(0).await;
    let (status, body) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_list_activities_paginates_newest_first() {
    let app = app_with_activities(5).await;

    let (status, body) = get_json(app.clone(), "/api/activities?page=1&per_page=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 5);
    assert!(body["last_synced"].as_str().unwrap() > "2024-01-01");
    assert_eq!(body["activities"][0]["id"], 5);
    assert_eq!(body["activities"][1]["id"], 4);

    let (_, body) = get_json(app, "/api/activities?page=3&per_page=2").await;
    let last = body["activities"].as_array().unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0]["id"], 1);
    assert_eq!(last[0]["start_date"], "2024-01-01T08:00:00Z");
}

#[tokio::test]
async fn test_list_activities_caps_per_page() {
    let app = app_with_activities(1).await;
    let (status, body) = get_json(app, "/api/activities?per_page=5000").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["per_page"], 100);
}

#[tokio::test]
async fn test_list_activities_rejects_page_zero() {
    let app = app_with_activities(1).await;

    let (status, body) = get_json(app.clone(), "/api/activities?page=0&per_page=10").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, _) = get_json(app, "/api/activities?per_page=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_activity_uses_wire_field_names() {
    let server = MockServer::start().await;
    let store = test_store().await;
    store
        .commit(&[normalize(&raw(fixture_activity()))], chrono::Utc::now())
        .await
        .unwrap();
    let (app, _) = create_test_app(&server, store);

    let (status, body) = get_json(app, "/api/activities/154504250376823").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "Ride");
    assert_eq!(body["start_lat"], 37.83);
    assert_eq!(body["end_lng"], -122.25);
    assert!(body["workout_type"].is_null());
}

#[tokio::test]
async fn test_get_missing_activity_is_not_found() {
    let app = app_with_activities(1).await;
    let (status, body) = get_json(app, "/api/activities/999").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_activity_route_is_decoded() {
    let app = app_with_activities(1).await;
    let (status, body) = get_json(app, "/api/activities/1/route").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 1);
    let points = body["points"].as_array().unwrap();
    assert_eq!(points.len(), 3);
    assert_eq!(points[0][0], 38.5);
    assert_eq!(points[0][1], -120.2);
}

fn trigger(token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/tasks/sync");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Wait for a background run to release the run lock.
async fn wait_for_idle(state: &AppState) {
    for _ in 0..200 {
        if state.sync_service.begin_run().is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("background sync did not finish");
}

#[tokio::test]
async fn test_trigger_sync_runs_in_background() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_feed(&server, vec![activity(7, "2024-03-01T08:00:00Z")]).await;
    let (app, state) = create_test_app(&server, test_store().await);

    let response = app.oneshot(trigger(Some(TEST_TRIGGER_TOKEN))).await.unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    wait_for_idle(&state).await;
    assert!(state.store.contains(7).await.unwrap());
}

#[tokio::test]
async fn test_trigger_sync_answers_before_run_completes() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v3/athlete/activities"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([activity(7, "2024-03-01T08:00:00Z")]))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    mount_page(&server, 2, vec![]).await;
    let (app, state) = create_test_app(&server, test_store().await);

    // The response arrives long before the slow page does.
    let response = tokio::time::timeout(
        Duration::from_millis(100),
        app.oneshot(trigger(Some(TEST_TRIGGER_TOKEN))),
    )
    .await
    .expect("trigger should answer without waiting for the run")
    .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    wait_for_idle(&state).await;
    assert!(state.store.contains(7).await.unwrap());
}

#[tokio::test]
async fn test_trigger_sync_while_running_is_conflict() {
    let server = MockServer::start().await;
    let (app, state) = create_test_app(&server, test_store().await);
    let _running = state.sync_service.begin_run().unwrap();

    let response = app.oneshot(trigger(Some(TEST_TRIGGER_TOKEN))).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_trigger_sync_requires_token() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_feed(&server, vec![activity(7, "2024-03-01T08:00:00Z")]).await;
    let (app, state) = create_test_app(&server, test_store().await);

    let response = app.clone().oneshot(trigger(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.oneshot(trigger(Some("guess"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Nothing was started.
    assert!(state.sync_service.begin_run().is_ok());
    assert_eq!(state.store.count_activities().await.unwrap(), 0);
}

#[tokio::test]
async fn test_trigger_sync_disabled_without_configured_token() {
    let server = MockServer::start().await;
    let store = test_store().await;
    let mut config = test_config(&server);
    config.sync_trigger_token = None;
    let state = Arc::new(AppState {
        sync_service: SyncService::new(&config, store.clone()),
        config,
        store,
    });
    let app = create_router(state);

    let response = app.oneshot(trigger(Some(TEST_TRIGGER_TOKEN))).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
