// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for the sync pipeline and consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Failure of a sync run (or of one step inside it).
///
/// Per-record problems never show up here: missing fields become nulls and
/// unparseable dates degrade the record to unranked. Everything below aborts
/// the run without touching persisted state.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Strava answered 429 for this page.
    #[error("Strava rate limit hit (page {page})")]
    RateLimited { page: u32 },

    /// A 2xx page that did not decode to a list of activity objects.
    /// Strava reports quota exhaustion this way too, so it is retried like
    /// `RateLimited`.
    #[error("Malformed activity page {page}: {detail}")]
    MalformedPage { page: u32, detail: String },

    #[error("Strava rejected the access token")]
    Unauthorized,

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Strava API error: {0}")]
    StravaApi(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// An activity id that is already stored (or repeated within the batch).
    #[error("Duplicate activity id: {0}")]
    DuplicateKey(String),

    #[error("A sync run is already in progress")]
    AlreadyRunning,
}

impl SyncError {
    /// Whether the fetcher may cool down and retry the page once.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::RateLimited { .. } | SyncError::MalformedPage { .. }
        )
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => {
                SyncError::DuplicateKey(db_err.message().to_string())
            }
            _ => SyncError::Persistence(err.to_string()),
        }
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Sync(SyncError::AlreadyRunning) => {
                (StatusCode::CONFLICT, "sync_in_progress", None)
            }
            AppError::Sync(err @ (SyncError::RateLimited { .. } | SyncError::MalformedPage { .. })) => {
                (StatusCode::TOO_MANY_REQUESTS, "rate_limited", Some(err.to_string()))
            }
            AppError::Sync(
                err @ (SyncError::Unauthorized
                | SyncError::TokenExchange(_)
                | SyncError::StravaApi(_)),
            ) => (StatusCode::BAD_GATEWAY, "strava_error", Some(err.to_string())),
            AppError::Sync(err @ (SyncError::Persistence(_) | SyncError::DuplicateKey(_))) => {
                tracing::error!(error = %err, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
