// SPDX-License-Identifier: MIT

//! Synchronization-core configuration.
//!
//! Loaded once at startup by the embedding application; a `Default` impl
//! provides sensible values for tests and local development.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the sync core, loaded once at startup.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote collection holding profile documents.
    pub users_collection: String,

    /// Upper bound on any single remote call. The underlying SDK has its
    /// own timeout behavior, but we never rely on it: a hung call becomes
    /// a failure result instead of blocking the caller indefinitely.
    pub remote_timeout: Duration,

    /// Replay attempts per pending mutation within one drain pass.
    pub drain_retry_attempts: u32,

    /// Base backoff between replay attempts (doubled after each failure).
    pub drain_retry_backoff: Duration,

    /// Directory for the persisted local store (cache, pending mutations,
    /// session snapshot). `None` keeps everything in memory.
    pub storage_dir: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            users_collection: "users".to_string(),
            remote_timeout: Duration::from_secs(12),
            drain_retry_attempts: 3,
            drain_retry_backoff: Duration::from_millis(500),
            storage_dir: None,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional; unset values fall back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();

        Ok(Self {
            users_collection: env::var("EMBER_USERS_COLLECTION")
                .unwrap_or(defaults.users_collection),
            remote_timeout: env_duration_secs("EMBER_REMOTE_TIMEOUT_SECS")?
                .unwrap_or(defaults.remote_timeout),
            drain_retry_attempts: env_u32("EMBER_DRAIN_RETRY_ATTEMPTS")?
                .unwrap_or(defaults.drain_retry_attempts),
            drain_retry_backoff: env_duration_millis("EMBER_DRAIN_RETRY_BACKOFF_MS")?
                .unwrap_or(defaults.drain_retry_backoff),
            storage_dir: env::var("EMBER_STORAGE_DIR").ok().map(PathBuf::from),
        })
    }
}

fn env_u32(name: &'static str) -> Result<Option<u32>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(None),
    }
}

fn env_duration_secs(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    Ok(env_u32(name)?.map(|s| Duration::from_secs(s.into())))
}

fn env_duration_millis(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    Ok(env_u32(name)?.map(|ms| Duration::from_millis(ms.into())))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
