//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FAVLINK_*)
//! 2. TOML config file (if FAVLINK_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FAVLINK_*)
/// 2. TOML config file (if FAVLINK_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the JSON cache file.
    ///
    /// Set via FAVLINK_CACHE_PATH environment variable.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Maximum number of cache entries kept after eviction.
    ///
    /// Set via FAVLINK_MAX_CACHE_ENTRIES environment variable.
    #[serde(default = "default_max_cache_entries")]
    pub max_cache_entries: usize,

    /// Number of links processed concurrently per batch.
    ///
    /// Set via FAVLINK_BATCH_SIZE environment variable.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Shared timeout for one icon fetch attempt, in milliseconds.
    ///
    /// Set via FAVLINK_FETCH_TIMEOUT_MS environment variable.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Number of retries after a failed fetch attempt.
    ///
    /// Set via FAVLINK_RETRY_COUNT environment variable.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Trailing-edge debounce delay before a processing run, in milliseconds.
    ///
    /// Set via FAVLINK_DEBOUNCE_MS environment variable.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Pause between consecutive batches, in milliseconds.
    ///
    /// Set via FAVLINK_BATCH_PAUSE_MS environment variable.
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,

    /// User-Agent string for icon probes.
    ///
    /// Set via FAVLINK_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("./favlink-cache.json")
}

fn default_max_cache_entries() -> usize {
    500
}

fn default_batch_size() -> usize {
    15
}

fn default_fetch_timeout_ms() -> u64 {
    3_000
}

fn default_retry_count() -> u32 {
    3
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_batch_pause_ms() -> u64 {
    100
}

fn default_user_agent() -> String {
    "favlink/0.1".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_path: default_cache_path(),
            max_cache_entries: default_max_cache_entries(),
            batch_size: default_batch_size(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            retry_count: default_retry_count(),
            debounce_ms: default_debounce_ms(),
            batch_pause_ms: default_batch_pause_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl AppConfig {
    /// Fetch timeout as Duration for use with reqwest/tokio.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Debounce delay as Duration.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Inter-batch pause as Duration.
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `FAVLINK_`
    /// 2. TOML file from `FAVLINK_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("FAVLINK_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("FAVLINK_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cache_path, PathBuf::from("./favlink-cache.json"));
        assert_eq!(config.max_cache_entries, 500);
        assert_eq!(config.batch_size, 15);
        assert_eq!(config.fetch_timeout_ms, 3_000);
        assert_eq!(config.retry_count, 3);
        assert_eq!(config.debounce_ms, 500);
        assert_eq!(config.batch_pause_ms, 100);
        assert_eq!(config.user_agent, "favlink/0.1");
    }

    #[test]
    fn test_duration_helpers() {
        let config = AppConfig::default();
        assert_eq!(config.fetch_timeout(), Duration::from_millis(3_000));
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.batch_pause(), Duration::from_millis(100));
    }
}
