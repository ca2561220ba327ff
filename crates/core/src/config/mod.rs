//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (TETHER_*)
//! 2. TOML config file (if TETHER_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Notification raised when a new deployment is detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_title")]
    pub title: String,

    #[serde(default = "default_notification_body")]
    pub body: String,

    /// Icon reference, resolved against the origin by the host.
    #[serde(default = "default_notification_icon")]
    pub icon: String,

    /// Tag so repeated notifications replace each other on the host.
    #[serde(default = "default_notification_tag")]
    pub tag: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: default_notification_title(),
            body: default_notification_body(),
            icon: default_notification_icon(),
            tag: default_notification_tag(),
        }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (TETHER_*)
/// 2. TOML config file (if TETHER_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database standing in for host cache storage.
    ///
    /// Set via TETHER_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the application is served from; relative URLs resolve against it.
    ///
    /// Set via TETHER_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Name of the install-time partition.
    #[serde(default = "default_static_cache_name")]
    pub static_cache_name: String,

    /// Name of the runtime partition written by the strategies.
    #[serde(default = "default_dynamic_cache_name")]
    pub dynamic_cache_name: String,

    /// Assets fetched into the static partition on install.
    #[serde(default = "default_precache_urls")]
    pub precache_urls: Vec<String>,

    /// Shell document served to offline navigations.
    #[serde(default = "default_shell_url")]
    pub shell_url: String,

    /// Canonical resource compared by the update checker.
    #[serde(default = "default_shell_url")]
    pub version_check_url: String,

    /// Synthetic key under which CACHE_DATA payloads are stored.
    #[serde(default = "default_offline_data_url")]
    pub offline_data_url: String,

    /// URL substrings identifying analytics/telemetry requests.
    #[serde(default = "default_analytics_markers")]
    pub analytics_markers: Vec<String>,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via TETHER_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via TETHER_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via TETHER_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Seconds between periodic update checks; 0 disables the timer.
    ///
    /// Set via TETHER_UPDATE_CHECK_INTERVAL_SECS environment variable.
    #[serde(default = "default_update_check_interval_secs")]
    pub update_check_interval_secs: u64,

    /// Update notification contents.
    ///
    /// Nested keys via TETHER_NOTIFICATION__TITLE etc.
    #[serde(default)]
    pub notification: NotificationConfig,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./tether-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_static_cache_name() -> String {
    "static-cache-v1".into()
}

fn default_dynamic_cache_name() -> String {
    "dynamic-cache-v1".into()
}

fn default_precache_urls() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), "/manifest.json".into()]
}

fn default_shell_url() -> String {
    "/index.html".into()
}

fn default_offline_data_url() -> String {
    "/offline-data".into()
}

fn default_analytics_markers() -> Vec<String> {
    crate::classify::DEFAULT_ANALYTICS_MARKERS
        .iter()
        .map(|m| m.to_string())
        .collect()
}

fn default_user_agent() -> String {
    "tether/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_update_check_interval_secs() -> u64 {
    3600
}

fn default_notification_title() -> String {
    "Update available".into()
}

fn default_notification_body() -> String {
    "A new version of the app is available. Refresh to update.".into()
}

fn default_notification_icon() -> String {
    "/icons/icon-192x192.png".into()
}

fn default_notification_tag() -> String {
    "app-update".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            static_cache_name: default_static_cache_name(),
            dynamic_cache_name: default_dynamic_cache_name(),
            precache_urls: default_precache_urls(),
            shell_url: default_shell_url(),
            version_check_url: default_shell_url(),
            offline_data_url: default_offline_data_url(),
            analytics_markers: default_analytics_markers(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            update_check_interval_secs: default_update_check_interval_secs(),
            notification: NotificationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Periodic update-check interval, `None` when disabled.
    pub fn update_check_interval(&self) -> Option<Duration> {
        match self.update_check_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Parsed origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme: {other}") }),
        }
    }

    /// Resolve a configured URL (absolute or origin-relative).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming `field` if it does not resolve.
    pub fn resolve(&self, field: &str, value: &str) -> Result<Url, ConfigError> {
        self.origin_url()?
            .join(value)
            .map_err(|e| ConfigError::Invalid { field: field.into(), reason: format!("{value}: {e}") })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `TETHER_`
    /// 2. TOML file from `TETHER_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("TETHER_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("TETHER_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
