//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

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
    /// - a cache name is empty, or both names are equal
    /// - `shell_url`, `version_check_url`, `offline_data_url` or a precache URL does not resolve
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `update_check_interval_secs` is between 1 and 59
    /// - `user_agent` is empty
    ///
    /// Returns `ConfigError::Missing` if `shell_url` is not pre-cached, since
    /// offline navigations could then never be served.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.origin_url()?;

        if self.static_cache_name.trim().is_empty() {
            return Err(invalid("static_cache_name", "must not be empty"));
        }
        if self.dynamic_cache_name.trim().is_empty() {
            return Err(invalid("dynamic_cache_name", "must not be empty"));
        }
        if self.static_cache_name == self.dynamic_cache_name {
            return Err(invalid("dynamic_cache_name", "must differ from static_cache_name"));
        }

        let shell = self.resolve("shell_url", &self.shell_url)?;
        self.resolve("version_check_url", &self.version_check_url)?;
        self.resolve("offline_data_url", &self.offline_data_url)?;

        let mut shell_precached = false;
        for url in &self.precache_urls {
            if self.resolve("precache_urls", url)? == shell {
                shell_precached = true;
            }
        }
        if !shell_precached {
            return Err(ConfigError::Missing {
                field: "precache_urls".into(),
                hint: format!("add the shell document {} so offline navigations can be served", self.shell_url),
            });
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

        if (1..60).contains(&self.update_check_interval_secs) {
            return Err(invalid("update_check_interval_secs", "must be 0 (disabled) or at least 60"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.analytics_markers.is_empty() {
            tracing::warn!("analytics_markers is empty; telemetry requests will be cached like API data");
        }

        Ok(())
    }
}
