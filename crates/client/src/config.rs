//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FAIRMARKET_BASE_URL` - Base URL of the storefront API
//!
//! ## Optional
//! - `FAIRMARKET_TIMEOUT_MS` - Request timeout in milliseconds (default: 5000)
//! - `FAIRMARKET_PAGE_LIMIT` - Default page size for list reads (default: 10)
//! - `FAIRMARKET_STALE_TIME_SECS` - Query staleness window (default: 300)
//! - `FAIRMARKET_RETRY` - Retries after a failed fetch (default: 3)
//! - `FAIRMARKET_STORAGE_DIR` - Directory for persisted store snapshots

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the storefront API (trailing slash recommended).
    pub base_url: Url,
    /// Fixed per-request timeout enforced at the network boundary.
    pub request_timeout: Duration,
    /// Default page size for paginated list reads.
    pub page_limit: u32,
    /// Age after which cached query data is considered stale.
    pub stale_time: Duration,
    /// Retries after a failed fetch (exponential backoff).
    pub retry: u32,
    /// Directory for persisted store snapshots; `None` keeps stores
    /// memory-only.
    pub storage_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a
    /// value fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = get_required_env("FAIRMARKET_BASE_URL")?
            .parse::<Url>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("FAIRMARKET_BASE_URL".to_string(), e.to_string())
            })?;
        let timeout_ms = parse_env_or_default("FAIRMARKET_TIMEOUT_MS", 5000_u64)?;
        let page_limit = parse_env_or_default("FAIRMARKET_PAGE_LIMIT", 10_u32)?;
        let stale_secs = parse_env_or_default("FAIRMARKET_STALE_TIME_SECS", 300_u64)?;
        let retry = parse_env_or_default("FAIRMARKET_RETRY", 3_u32)?;
        let storage_dir = get_optional_env("FAIRMARKET_STORAGE_DIR").map(PathBuf::from);

        Ok(Self {
            base_url,
            request_timeout: Duration::from_millis(timeout_ms),
            page_limit,
            stale_time: Duration::from_secs(stale_secs),
            retry,
            storage_dir,
        })
    }

    /// Configuration with library defaults against the given base URL.
    ///
    /// Useful for tests and embedding without environment setup.
    #[must_use]
    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            base_url,
            request_timeout: Duration::from_millis(5000),
            page_limit: 10,
            stale_time: Duration::from_secs(300),
            retry: 3,
            storage_dir: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Parse an environment variable with a default value.
fn parse_env_or_default<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
