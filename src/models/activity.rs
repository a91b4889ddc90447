// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava activity models: the raw API shape and the flat stored row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One activity exactly as the Strava list endpoint delivered it.
///
/// Untrusted: any field may be missing or carry an unexpected type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawActivity(Map<String, Value>);

impl RawActivity {
    /// Look up a top-level field. JSON `null` is reported as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// The raw `start_date` string, if present.
    pub fn start_date_raw(&self) -> Option<&str> {
        self.get("start_date").and_then(Value::as_str)
    }
}

impl TryFrom<Value> for RawActivity {
    type Error = Value;

    /// Only JSON objects are activities; anything else is handed back.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

/// Flat activity row stored in the `activities` table.
///
/// Every field may be null: the normalizer substitutes `None` for anything
/// the source omitted. Rows are append-only once stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedActivity {
    /// Strava activity ID (primary key)
    pub id: Option<i64>,
    pub name: Option<String>,
    /// Distance in meters
    pub distance: Option<f64>,
    /// Moving time in seconds
    pub moving_time: Option<i64>,
    /// Elapsed time in seconds
    pub elapsed_time: Option<i64>,
    /// Elevation gain in meters
    pub total_elevation_gain: Option<f64>,
    /// Activity category (Ride, Run, Hike, ...)
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
    pub workout_type: Option<i64>,
    pub location_country: Option<String>,
    pub achievement_count: Option<i64>,
    pub kudos_count: Option<i64>,
    /// Encoded route polyline from `map.summary_polyline`
    pub summary_polyline: Option<String>,
    pub start_lat: Option<f64>,
    pub start_lng: Option<f64>,
    pub end_lat: Option<f64>,
    pub end_lng: Option<f64>,
    pub comment_count: Option<i64>,
    pub athlete_count: Option<i64>,
    /// Meters per second
    pub average_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub average_cadence: Option<f64>,
    pub average_temp: Option<f64>,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub start_date: Option<DateTime<Utc>>,
}
