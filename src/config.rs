//! Application configuration loaded from environment variables.
//!
//! Everything the pipeline needs (credentials, endpoints, rate-limit policy)
//! is read once at startup and handed to each component at construction.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default Strava REST API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://www.strava.com/api/v3";
/// Default Strava OAuth token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://www.strava.com/oauth/token";
/// Strava's short-term rate-limit window (15 minutes).
pub const DEFAULT_COOLDOWN_SECS: u64 = 15 * 60;
/// Pause proactively every this many pages.
pub const DEFAULT_PAUSE_EVERY_PAGES: u32 = 75;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Strava credentials ---
    /// Strava OAuth client ID
    pub strava_client_id: String,
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// Long-lived refresh token exchanged for a bearer token on every run
    pub strava_refresh_token: String,

    // --- Endpoints ---
    /// REST API base URL (overridable for tests)
    pub api_base_url: String,
    /// OAuth token endpoint
    pub token_url: String,
    /// sqlx connection URL for the activity store
    pub database_url: String,
    /// Server port (serve mode)
    pub port: u16,
    /// Bearer token required by `POST /tasks/sync`. Unset disables the trigger.
    pub sync_trigger_token: Option<String>,

    /// Fetch/commit policy for sync runs
    pub sync: SyncSettings,
}

/// Policy knobs for one sync run.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// How long to suspend after a rate-limit rejection (and on proactive pauses).
    pub cooldown: Duration,
    /// Proactively pause before every page whose number is a multiple of this.
    /// Zero disables proactive pauses.
    pub pause_every_pages: u32,
    /// Records requested per page.
    pub per_page: u32,
    /// Whether the API delivers records newest-first. When false the run scans
    /// every page and filters instead of stopping at the first covered record.
    pub assume_descending: bool,
    /// Directory for the per-run JSON export, if enabled.
    pub export_dir: Option<PathBuf>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECS),
            pause_every_pages: DEFAULT_PAUSE_EVERY_PAGES,
            per_page: 1,
            assume_descending: true,
            export_dir: None,
        }
    }
}

impl SyncSettings {
    /// Settings for tests: no waiting, no proactive pauses.
    pub fn immediate() -> Self {
        Self {
            cooldown: Duration::ZERO,
            pause_every_pages: 0,
            ..Self::default()
        }
    }
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            strava_client_id: "test_client_id".to_string(),
            strava_client_secret: "test_secret".to_string(),
            strava_refresh_token: "test_refresh_token".to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            database_url: "sqlite::memory:".to_string(),
            port: 8080,
            sync_trigger_token: Some("test-trigger-token".to_string()),
            sync: SyncSettings::immediate(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let sync = SyncSettings {
            cooldown: Duration::from_secs(parse_var("SYNC_COOLDOWN_SECS", DEFAULT_COOLDOWN_SECS)?),
            pause_every_pages: parse_var("SYNC_PAUSE_EVERY_PAGES", DEFAULT_PAUSE_EVERY_PAGES)?,
            per_page: parse_var("SYNC_PER_PAGE", 1u32)?,
            assume_descending: parse_var("SYNC_ASSUME_DESCENDING", true)?,
            export_dir: env::var("SYNC_EXPORT_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        };

        if sync.per_page == 0 {
            return Err(ConfigError::Invalid {
                name: "SYNC_PER_PAGE",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            strava_client_id: required("STRAVA_CLIENT_ID")?,
            strava_client_secret: required("STRAVA_CLIENT_SECRET")?,
            strava_refresh_token: required("STRAVA_REFRESH_TOKEN")?,
            api_base_url: env::var("STRAVA_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            token_url: env::var("STRAVA_TOKEN_URL").unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://strava.db?mode=rwc".to_string()),
            port: parse_var("PORT", 8080u16)?,
            sync_trigger_token: env::var("SYNC_TRIGGER_TOKEN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            sync,
        })
    }
}

/// Read a required secret, trimming stray whitespace from secret bindings.
fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
