//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (APPSHELL_*)
//! 2. TOML config file (if APPSHELL_CONFIG_FILE set)
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
/// 1. Environment variables (APPSHELL_*)
/// 2. TOML config file (if APPSHELL_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the mini app is served from. Relative request paths resolve against it.
    ///
    /// Set via APPSHELL_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite cache database.
    ///
    /// Set via APPSHELL_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Prefix of every cache namespace name. The install-time version is appended.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Paths stored at install time. Population is all-or-nothing.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Path regexes that are never read from or written to the cache.
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// File extensions (without the dot) handled by the asset strategy.
    #[serde(default = "default_asset_extensions")]
    pub asset_extensions: Vec<String>,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via APPSHELL_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Transport timeout in milliseconds. Unset means fetches may wait indefinitely.
    ///
    /// Set via APPSHELL_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Background sync tag that triggers the sync action.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    #[serde(default = "default_notification_title")]
    pub notification_title: String,

    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,

    #[serde(default = "default_notification_icon")]
    pub notification_badge: String,

    /// Body shown when a push message carries no payload.
    #[serde(default = "default_push_fallback_body")]
    pub push_fallback_body: String,
}

fn default_origin() -> String {
    "http://localhost:5173".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./appshell-cache.sqlite")
}

fn default_cache_prefix() -> String {
    "tma-cache".into()
}

fn default_precache() -> Vec<String> {
    ["/", "/manifest.json", "/icon-192.png", "/icon-512.png"].map(String::from).to_vec()
}

fn default_exclude_patterns() -> Vec<String> {
    [r"^/api/", r"\.hot-update\.(js|json)$", r"\.map$", r"^/@vite/", r"^/node_modules/"]
        .map(String::from)
        .to_vec()
}

fn default_asset_extensions() -> Vec<String> {
    [
        "js", "mjs", "css", "woff", "woff2", "ttf", "otf", "eot", "png", "jpg", "jpeg", "gif", "svg", "ico", "webp",
        "avif",
    ]
    .map(String::from)
    .to_vec()
}

fn default_user_agent() -> String {
    "appshell-sw/0.1".into()
}

fn default_sync_tag() -> String {
    "background-sync".into()
}

fn default_notification_title() -> String {
    "Referral Dashboard".into()
}

fn default_notification_icon() -> String {
    "/icon-192.png".into()
}

fn default_push_fallback_body() -> String {
    "New update available".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            db_path: default_db_path(),
            cache_prefix: default_cache_prefix(),
            precache: default_precache(),
            exclude_patterns: default_exclude_patterns(),
            asset_extensions: default_asset_extensions(),
            user_agent: default_user_agent(),
            timeout_ms: None,
            sync_tag: default_sync_tag(),
            notification_title: default_notification_title(),
            notification_icon: default_notification_icon(),
            notification_badge: default_notification_icon(),
            push_fallback_body: default_push_fallback_body(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `APPSHELL_`
    /// 2. TOML file from `APPSHELL_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("APPSHELL_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("APPSHELL_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
