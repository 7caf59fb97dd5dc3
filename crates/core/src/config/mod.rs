//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The worker's classification lists, partition names and static manifest
//! live in [`WorkerConfig`] and are handed to the router at construction.

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

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding cache partitions.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin of the site the worker serves, e.g. `https://example.com`.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// User-Agent string for network requests.
    ///
    /// Set via SWCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum response body size in bytes.
    ///
    /// Set via SWCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SWCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Worker routing and cache settings (SWCACHE_WORKER__*).
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Static routing data for the offline worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Prefix shared by every partition name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version tag; changing it invalidates all partitions on next activation.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Assets fetched at install time. Paths resolve against the origin.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// URL substrings that mark a request as a static asset.
    #[serde(default = "default_static_markers")]
    pub static_markers: Vec<String>,

    /// URL substrings that mark a request as an image.
    #[serde(default = "default_image_patterns")]
    pub image_patterns: Vec<String>,

    /// URL substrings that mark a request as a content page.
    #[serde(default = "default_content_patterns")]
    pub content_patterns: Vec<String>,

    /// Root path of the blog; anything under it is content.
    #[serde(default = "default_blog_root")]
    pub blog_root: String,

    /// Third-party hosts whose requests are intercepted.
    #[serde(default = "default_cdn_hosts")]
    pub cdn_hosts: Vec<String>,

    /// Content pages warmed at install time (best effort).
    #[serde(default = "default_precache_pages")]
    pub precache_pages: Vec<String>,

    /// Content pages refreshed by the `content-update` periodic sync.
    #[serde(default = "default_refresh_pages")]
    pub refresh_pages: Vec<String>,

    /// Page served when a content request fails with nothing cached.
    #[serde(default = "default_offline_url")]
    pub offline_url: String,

    /// Entries whose `Date` header is older than this are swept on cleanup.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// Endpoint that queued newsletter subscriptions are replayed to.
    #[serde(default = "default_subscribe_endpoint")]
    pub subscribe_endpoint: String,

    #[serde(default)]
    pub notification: NotificationDefaults,
}

/// Defaults for push notifications when the payload doesn't override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationDefaults {
    #[serde(default = "default_notification_title")]
    pub title: String,
    #[serde(default = "default_notification_body")]
    pub body: String,
    #[serde(default = "default_notification_icon")]
    pub icon: String,
    #[serde(default = "default_notification_badge")]
    pub badge: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:4000".into()
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_cache_prefix() -> String {
    "nachoweb3".into()
}

fn default_cache_version() -> String {
    "v1.0.0".into()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_static_assets() -> Vec<String> {
    strings(&[
        "/blog/",
        "/blog/assets/css/style.css",
        "/blog/assets/css/lazy-loading.css",
        "/blog/assets/css/breadcrumbs.css",
        "/blog/assets/css/enhancements.css",
        "/blog/assets/css/newsletter-popup.css",
        "/blog/assets/js/google-analytics-enhanced.js",
        "/blog/assets/js/lazy-loading-optimized.js",
        "/blog/assets/js/newsletter-system.js",
        "/blog/assets/js/matrix-rain.js",
        "/blog/assets/images/default-og.jpg",
        "/blog/assets/images/logo.png",
        "/blog/manifest.json",
        "https://fonts.googleapis.com/css2?family=Inter:wght@300;400;600;700&display=swap",
        "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.0.0/css/all.min.css",
    ])
}

fn default_static_markers() -> Vec<String> {
    strings(&["/assets/", "/css/", "/js/", "manifest.json"])
}

fn default_image_patterns() -> Vec<String> {
    strings(&["/blog/assets/images/", ".jpg", ".jpeg", ".png", ".webp", ".gif", ".svg"])
}

fn default_content_patterns() -> Vec<String> {
    strings(&[
        "/blog/",
        "/blog/ia/",
        "/blog/blockchain/",
        "/blog/tutoriales/",
        "/blog/newsletter/",
        "/blog/tag/",
        "/blog/category/",
        "/blog/search",
    ])
}

fn default_blog_root() -> String {
    "/blog/".into()
}

fn default_cdn_hosts() -> Vec<String> {
    strings(&[
        "fonts.googleapis.com",
        "fonts.gstatic.com",
        "cdnjs.cloudflare.com",
        "www.googletagmanager.com",
        "www.google-analytics.com",
        "connect.facebook.net",
        "platform.twitter.com",
    ])
}

fn default_precache_pages() -> Vec<String> {
    strings(&[
        "/blog/",
        "/blog/ia/",
        "/blog/blockchain/",
        "/blog/tutoriales/",
        "/blog/newsletter/",
        "/blog/offline.html",
    ])
}

fn default_refresh_pages() -> Vec<String> {
    strings(&["/blog/", "/blog/ia/", "/blog/blockchain/", "/blog/tutoriales/"])
}

fn default_offline_url() -> String {
    "/blog/offline.html".into()
}

fn default_retention_days() -> i64 {
    7
}

fn default_subscribe_endpoint() -> String {
    "/blog/api/subscribe".into()
}

fn default_notification_title() -> String {
    "NachoWeb3".into()
}

fn default_notification_body() -> String {
    "¡Nuevo contenido disponible en NachoWeb3!".into()
}

fn default_notification_icon() -> String {
    "/blog/assets/images/icons/icon-192x192.png".into()
}

fn default_notification_badge() -> String {
    "/blog/assets/images/icons/badge-72x72.png".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            worker: WorkerConfig::default(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            static_assets: default_static_assets(),
            static_markers: default_static_markers(),
            image_patterns: default_image_patterns(),
            content_patterns: default_content_patterns(),
            blog_root: default_blog_root(),
            cdn_hosts: default_cdn_hosts(),
            precache_pages: default_precache_pages(),
            refresh_pages: default_refresh_pages(),
            offline_url: default_offline_url(),
            retention_days: default_retention_days(),
            subscribe_endpoint: default_subscribe_endpoint(),
            notification: NotificationDefaults::default(),
        }
    }
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            title: default_notification_title(),
            body: default_notification_body(),
            icon: default_notification_icon(),
            badge: default_notification_badge(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The configured origin as a parsed URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_` (`__` separates nesting)
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

impl WorkerConfig {
    /// Retention window for the `CLEANUP_CACHE` sweep.
    pub fn retention(&self) -> Result<chrono::Duration, crate::Error> {
        chrono::Duration::try_days(self.retention_days).ok_or_else(|| {
            crate::Error::InvalidInput(format!("retention_days out of range: {}", self.retention_days))
        })
    }

    /// Current partition names, derived from prefix and version.
    pub fn partition_names(&self) -> PartitionNames {
        let (prefix, version) = (&self.cache_prefix, &self.cache_version);
        PartitionNames {
            umbrella: format!("{prefix}-{version}"),
            static_assets: format!("{prefix}-static-{version}"),
            content: format!("{prefix}-content-{version}"),
            images: format!("{prefix}-images-{version}"),
        }
    }
}

/// The four partition names for one cache version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PartitionNames {
    /// Version-tagged name kept only for cleanup matching; never written.
    pub umbrella: String,
    pub static_assets: String,
    pub content: String,
    pub images: String,
}

impl PartitionNames {
    /// The partitions that survive activation.
    pub fn current(&self) -> [&str; 3] {
        [&self.static_assets, &self.content, &self.images]
    }

    pub fn is_current(&self, name: &str) -> bool {
        self.current().contains(&name)
    }
}
