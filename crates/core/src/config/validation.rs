//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Longest accepted retention window, in days (about a century).
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent`, the cache prefix or the cache version is empty
    /// - `retention_days` is below one day or above `MAX_RETENTION_DAYS`
    ///
    /// Returns `ConfigError::Missing` if the static manifest is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", "scheme must be http or https"));
        }
        if origin.host_str().is_none() {
            return Err(invalid("origin", "must include a host"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        let worker = &self.worker;
        if worker.cache_prefix.trim().is_empty() {
            return Err(invalid("worker.cache_prefix", "must not be empty"));
        }
        if worker.cache_version.trim().is_empty() {
            return Err(invalid("worker.cache_version", "must not be empty"));
        }
        if worker.retention_days < 1 {
            return Err(invalid("worker.retention_days", "must be at least 1 day"));
        }
        if worker.retention_days > MAX_RETENTION_DAYS {
            return Err(invalid("worker.retention_days", "must not exceed 36500 days"));
        }
        if worker.static_assets.is_empty() {
            return Err(ConfigError::Missing {
                field: "worker.static_assets".into(),
                hint: "Set worker.static_assets in the TOML file named by SWCACHE_CONFIG_FILE".into(),
            });
        }
        for asset in &worker.static_assets {
            if origin.join(asset).is_err() {
                return Err(ConfigError::Invalid {
                    field: "worker.static_assets".into(),
                    reason: format!("cannot resolve {asset} against {origin}"),
                });
            }
        }

        if worker.precache_pages.iter().all(|p| p != &worker.offline_url) {
            tracing::warn!(
                offline_url = %worker.offline_url,
                "offline_url is not among precache_pages; the offline fallback will only exist once fetched"
            );
        }

        Ok(())
    }
}
