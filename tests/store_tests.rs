// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite store tests: atomic commits and the watermark history.

use chrono::{DateTime, TimeZone, Utc};
use strava_sync::db::{ActivitySink, SqliteStore};
use strava_sync::error::SyncError;
use strava_sync::models::{NormalizedActivity, SyncWatermark};
use strava_sync::services::normalize;

mod common;
use common::{activity, fixture_activity, raw, test_store};

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

fn record(id: i64) -> NormalizedActivity {
    normalize(&raw(activity(id, "2024-01-01T08:00:00Z")))
}

#[tokio::test]
async fn test_commit_then_read_back() {
    let store = test_store().await;
    let expected = normalize(&raw(fixture_activity()));

    store.commit(&[expected.clone()], at(2024, 3, 2)).await.unwrap();

    let id = expected.id.unwrap();
    assert_eq!(store.get_activity(id).await.unwrap(), Some(expected));
    assert!(store.contains(id).await.unwrap());
    assert!(!store.contains(1).await.unwrap());
    assert_eq!(store.count_activities().await.unwrap(), 1);
    assert_eq!(
        store.load_watermark().await.unwrap(),
        SyncWatermark::new(at(2024, 3, 2))
    );
}

#[tokio::test]
async fn test_list_activities_newest_first() {
    let store = test_store().await;
    let records = vec![
        normalize(&raw(activity(1, "2024-01-01T08:00:00Z"))),
        normalize(&raw(activity(3, "2024-03-01T08:00:00Z"))),
        normalize(&raw(activity(2, "2024-02-01T08:00:00Z"))),
    ];
    store.commit(&records, at(2024, 3, 2)).await.unwrap();

    let first_page = store.list_activities(2, 0).await.unwrap();
    let ids: Vec<_> = first_page.iter().filter_map(|a| a.id).collect();
    assert_eq!(ids, vec![3, 2]);

    let second_page = store.list_activities(2, 2).await.unwrap();
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].id, Some(1));
}

#[tokio::test]
async fn test_duplicate_in_later_chunk_rolls_back_whole_batch() {
    let store = test_store().await.with_insert_chunk_size(5);
    store.commit(&[record(108)], at(2024, 1, 1)).await.unwrap();
    let watermark_before = store.load_watermark().await.unwrap();

    // Ten records in two chunks; the eighth already exists.
    let batch: Vec<_> = (101..=110).map(record).collect();
    let err = store.commit(&batch, at(2024, 2, 1)).await.unwrap_err();

    assert!(matches!(err, SyncError::DuplicateKey(ref id) if id == "108"));
    for id in (101..=110).filter(|id| *id != 108) {
        assert!(!store.contains(id).await.unwrap(), "{} leaked", id);
    }
    assert_eq!(store.count_activities().await.unwrap(), 1);
    assert_eq!(store.load_watermark().await.unwrap(), watermark_before);
}

#[tokio::test]
async fn test_recommitting_same_record_is_duplicate_key() {
    let store = test_store().await;
    store.commit(&[record(5)], at(2024, 1, 1)).await.unwrap();

    let err = store.commit(&[record(5)], at(2024, 1, 2)).await.unwrap_err();

    assert!(matches!(err, SyncError::DuplicateKey(_)));
    assert_eq!(
        store.load_watermark().await.unwrap(),
        SyncWatermark::new(at(2024, 1, 1))
    );
}

#[tokio::test]
async fn test_watermark_is_max_of_history() {
    let store = test_store().await;
    store.commit(&[record(1)], at(2024, 5, 1)).await.unwrap();
    // An older value appended later does not move the watermark back.
    store.commit(&[record(2)], at(2024, 4, 1)).await.unwrap();

    assert_eq!(
        store.load_watermark().await.unwrap(),
        SyncWatermark::new(at(2024, 5, 1))
    );

    let history: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sync_watermark")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(history, 2);
}

#[tokio::test]
async fn test_file_database_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("activities.db").display());

    let store = SqliteStore::connect(&url).await.unwrap();
    store.commit(&[record(9)], at(2024, 6, 1)).await.unwrap();
    store.pool().close().await;

    let reopened = SqliteStore::connect(&url).await.unwrap();
    assert!(reopened.contains(9).await.unwrap());
    assert_eq!(
        reopened.load_watermark().await.unwrap(),
        SyncWatermark::new(at(2024, 6, 1))
    );
}
