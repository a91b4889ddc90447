// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client for fetching activity pages.
//!
//! Handles:
//! - Refresh-token exchange for a bearer token
//! - Paged activity listing
//! - Rate limit detection (429 and error-shaped bodies)

use crate::config::Config;
use crate::error::SyncError;
use crate::models::RawActivity;
use serde::Deserialize;
use serde_json::Value;

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: crate::config::DEFAULT_API_BASE_URL.to_string(),
            token_url: crate::config::DEFAULT_TOKEN_URL.to_string(),
            client_id,
            client_secret,
        }
    }

    /// Build a client from application config (endpoints included).
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.strava_client_id.clone(),
            config.strava_client_secret.clone(),
        )
        .with_endpoints(&config.api_base_url, &config.token_url)
    }

    /// Point the client at different endpoints (mock servers in tests).
    pub fn with_endpoints(mut self, base_url: &str, token_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self.token_url = token_url.to_string();
        self
    }

    /// Exchange the long-lived refresh token for a bearer token.
    pub async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse, SyncError> {
        tracing::info!("Requesting Strava access token");

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| SyncError::TokenExchange(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Strava token exchange failed");
            return Err(SyncError::TokenExchange(format!(
                "token endpoint returned {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SyncError::TokenExchange(format!("failed to parse token response: {}", e)))
    }

    /// Fetch one page of the athlete's activities, newest first.
    ///
    /// An empty vector means there is no more data.
    pub async fn list_activities_page(
        &self,
        access_token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<RawActivity>, SyncError> {
        let url = format!("{}/athlete/activities", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("per_page", per_page.to_string()), ("page", page.to_string())])
            .send()
            .await
            .map_err(|e| SyncError::StravaApi(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!(page, "Strava rate limit hit (429)");
                return Err(SyncError::RateLimited { page });
            }

            if status.as_u16() == 401 {
                return Err(SyncError::Unauthorized);
            }

            return Err(SyncError::StravaApi(format!("HTTP {}: {}", status, body)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::StravaApi(e.to_string()))?;

        decode_page(page, &body)
    }
}

/// Decode a 2xx body into raw activities.
///
/// Anything other than a JSON array of objects is a malformed page; Strava
/// also answers quota exhaustion with a `{"message": ...}` object here.
pub fn decode_page(page: u32, body: &str) -> Result<Vec<RawActivity>, SyncError> {
    let value: Value = serde_json::from_str(body).map_err(|e| SyncError::MalformedPage {
        page,
        detail: format!("invalid JSON: {}", e),
    })?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => {
            let message = map
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unexpected object");
            return Err(SyncError::MalformedPage {
                page,
                detail: format!("error-shaped response: {}", message),
            });
        }
        other => {
            return Err(SyncError::MalformedPage {
                page,
                detail: format!("expected array, got {}", json_kind(&other)),
            })
        }
    };

    items
        .into_iter()
        .map(|item| {
            RawActivity::try_from(item).map_err(|other| SyncError::MalformedPage {
                page,
                detail: format!("expected activity object, got {}", json_kind(&other)),
            })
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Token refresh response from Strava.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}
