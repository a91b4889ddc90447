// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Field normalization: raw Strava activity -> flat stored row.
//!
//! Pure and infallible. Absent fields, JSON nulls and values of the wrong
//! type all become `None`; nothing here ever rejects a record.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::models::{NormalizedActivity, RawActivity};
use crate::time_utils::parse_strava_date;

/// Columns of the `activities` table, in insert order.
pub const TARGET_FIELDS: [&str; 25] = [
    "id",
    "name",
    "distance",
    "moving_time",
    "elapsed_time",
    "total_elevation_gain",
    "type",
    "workout_type",
    "location_country",
    "achievement_count",
    "kudos_count",
    "summary_polyline",
    "start_lat",
    "start_lng",
    "end_lat",
    "end_lng",
    "comment_count",
    "athlete_count",
    "average_speed",
    "max_speed",
    "average_cadence",
    "average_temp",
    "average_heartrate",
    "max_heartrate",
    "start_date",
];

/// Map one raw activity onto the fixed target shape.
pub fn normalize(raw: &RawActivity) -> NormalizedActivity {
    let (start_lat, start_lng) = lat_lng(raw.get("start_latlng"));
    let (end_lat, end_lng) = lat_lng(raw.get("end_latlng"));

    NormalizedActivity {
        id: int(raw.get("id")),
        name: text(raw.get("name")),
        distance: float(raw.get("distance")),
        moving_time: int(raw.get("moving_time")),
        elapsed_time: int(raw.get("elapsed_time")),
        total_elevation_gain: float(raw.get("total_elevation_gain")),
        activity_type: text(raw.get("type")),
        workout_type: int(raw.get("workout_type")),
        location_country: text(raw.get("location_country")),
        achievement_count: int(raw.get("achievement_count")),
        kudos_count: int(raw.get("kudos_count")),
        summary_polyline: text(raw.get("map").and_then(|map| map.get("summary_polyline"))),
        start_lat,
        start_lng,
        end_lat,
        end_lng,
        comment_count: int(raw.get("comment_count")),
        athlete_count: int(raw.get("athlete_count")),
        average_speed: float(raw.get("average_speed")),
        max_speed: float(raw.get("max_speed")),
        average_cadence: float(raw.get("average_cadence")),
        average_temp: float(raw.get("average_temp")),
        average_heartrate: float(raw.get("average_heartrate")),
        max_heartrate: float(raw.get("max_heartrate")),
        start_date: parse_start_date(raw),
    }
}

/// Parse the record's `start_date`. `None` marks the record as unranked.
pub fn parse_start_date(raw: &RawActivity) -> Option<DateTime<Utc>> {
    raw.start_date_raw().and_then(parse_strava_date)
}

fn text(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn float(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Split a `[lat, lng]` pair. Strava sends `[]` for activities without GPS.
fn lat_lng(value: Option<&Value>) -> (Option<f64>, Option<f64>) {
    match value.and_then(Value::as_array).map(Vec::as_slice) {
        Some([lat, lng, ..]) => (float(Some(lat)), float(Some(lng))),
        _ => (None, None),
    }
}
