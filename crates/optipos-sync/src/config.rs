//! # Sync Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     OPTIPOS_BACKEND_URL=https://xyz.example.co                         │
//! │     OPTIPOS_API_KEY=...                                                │
//! │     OPTIPOS_SYNC_MODE=manual                                           │
//! │     OPTIPOS_BATCH_SIZE=50                                              │
//! │     OPTIPOS_SYNC_INTERVAL_SECS=300                                     │
//! │     OPTIPOS_STORE_ID=salmiya                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/optipos/sync.toml (Linux)                                │
//! │     ~/Library/Application Support/com.optipos.optipos/sync.toml        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     SyncMode::Manual, no backend                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [backend]
//! url = "https://xyz.example.co"
//! api_key = "public-anon-key"
//! request_timeout_secs = 20
//!
//! [store]
//! id = "salmiya"
//! name = "Salmiya Branch"
//!
//! [sync]
//! mode = "auto"          # auto | manual | offline
//! batch_size = 50        # clamped to 1..=100
//! interval_secs = 300
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};

/// Largest batch the backend accepts in one request.
pub const MAX_BATCH_SIZE: usize = 100;

pub const BACKEND_URL_ENV: &str = "OPTIPOS_BACKEND_URL";
pub const API_KEY_ENV: &str = "OPTIPOS_API_KEY";
pub const SYNC_MODE_ENV: &str = "OPTIPOS_SYNC_MODE";
pub const BATCH_SIZE_ENV: &str = "OPTIPOS_BATCH_SIZE";
pub const SYNC_INTERVAL_ENV: &str = "OPTIPOS_SYNC_INTERVAL_SECS";
pub const STORE_ID_ENV: &str = "OPTIPOS_STORE_ID";

// =============================================================================
// Sync Mode
// =============================================================================

/// When sync runs.
///
/// ```text
/// AUTO     background loop every `interval_secs`, plus manual triggers
/// MANUAL   only when the user presses "Sync" (default)
/// OFFLINE  never; local operation only
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Auto,
    #[default]
    Manual,
    Offline,
}

impl SyncMode {
    pub fn is_sync_enabled(&self) -> bool {
        !matches!(self, SyncMode::Offline)
    }

    pub fn runs_in_background(&self) -> bool {
        matches!(self, SyncMode::Auto)
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Auto => write!(f, "auto"),
            SyncMode::Manual => write!(f, "manual"),
            SyncMode::Offline => write!(f, "offline"),
        }
    }
}

impl std::str::FromStr for SyncMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "background" => Ok(SyncMode::Auto),
            "manual" | "on_demand" => Ok(SyncMode::Manual),
            "offline" | "disabled" => Ok(SyncMode::Offline),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown sync mode: '{}'. Valid options: auto, manual, offline",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Where the hosted backend lives and how to authenticate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyz.example.co`. Tables live under
    /// `{url}/rest/v1/{table}`.
    #[serde(default)]
    pub url: Option<String>,

    /// Public API key, sent as both `apikey` and bearer token.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    20
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            url: None,
            api_key: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub id: String,

    #[serde(default)]
    pub name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            id: "default-store".to_string(),
            name: "Default Store".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default)]
    pub mode: SyncMode,

    /// Rows per insert request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Seconds between background runs in `auto` mode.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Attempts per request for transient failures. 0 disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_batch_size() -> usize {
    50
}
fn default_interval() -> u64 {
    300
}
fn default_max_retries() -> u32 {
    3
}
fn default_initial_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    10
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            mode: SyncMode::default(),
            batch_size: default_batch_size(),
            interval_secs: default_interval(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub sync: SyncSettings,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Checks the backend URL and clamps the batch size into `1..=100`.
    pub fn validate(&mut self) -> SyncResult<()> {
        if let Some(raw) = &self.backend.url {
            let parsed = Url::parse(raw)?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(SyncError::InvalidUrl(format!(
                    "Backend URL must start with http:// or https://, got: {}",
                    raw
                )));
            }
        }

        let clamped = self.sync.batch_size.clamp(1, MAX_BATCH_SIZE);
        if clamped != self.sync.batch_size {
            warn!(
                requested = self.sync.batch_size,
                used = clamped,
                "Batch size out of range, clamped"
            );
            self.sync.batch_size = clamped;
        }

        if self.sync.interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "interval_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies overrides from a key lookup (the process environment in
    /// production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(BACKEND_URL_ENV).filter(|v| !v.trim().is_empty()) {
            debug!(url = %url, "Overriding backend URL from environment");
            self.backend.url = Some(url);
        }

        if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            self.backend.api_key = Some(key);
        }

        if let Some(mode) = lookup(SYNC_MODE_ENV) {
            match mode.parse() {
                Ok(parsed) => {
                    debug!(mode = %mode, "Overriding sync mode from environment");
                    self.sync.mode = parsed;
                }
                Err(e) => warn!(mode = %mode, error = %e, "Ignoring sync mode from environment"),
            }
        }

        if let Some(size) = lookup(BATCH_SIZE_ENV) {
            match size.trim().parse::<usize>() {
                Ok(n) => self.sync.batch_size = n,
                Err(_) => warn!(value = %size, "Ignoring non-numeric batch size"),
            }
        }

        if let Some(secs) = lookup(SYNC_INTERVAL_ENV) {
            match secs.trim().parse::<u64>() {
                Ok(n) => self.sync.interval_secs = n,
                Err(_) => warn!(value = %secs, "Ignoring non-numeric sync interval"),
            }
        }

        if let Some(id) = lookup(STORE_ID_ENV) {
            self.store.id = id;
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "optipos", "optipos")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn mode(&self) -> SyncMode {
        self.sync.mode
    }

    pub fn is_sync_enabled(&self) -> bool {
        self.sync.mode.is_sync_enabled()
    }

    /// True when both a URL and a key are present.
    pub fn has_backend(&self) -> bool {
        self.backend.url.is_some() && self.backend.api_key.is_some()
    }

    pub fn batch_size(&self) -> usize {
        self.sync.batch_size.clamp(1, MAX_BATCH_SIZE)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_sync_mode_parsing() {
        assert_eq!("auto".parse::<SyncMode>().unwrap(), SyncMode::Auto);
        assert_eq!("Manual".parse::<SyncMode>().unwrap(), SyncMode::Manual);
        assert_eq!("disabled".parse::<SyncMode>().unwrap(), SyncMode::Offline);
        assert!("primary".parse::<SyncMode>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.mode(), SyncMode::Manual);
        assert_eq!(config.batch_size(), 50);
        assert!(!config.has_backend());
    }

    #[test]
    fn test_batch_size_is_clamped() {
        let mut config = SyncConfig::default();
        config.sync.batch_size = 500;
        config.validate().unwrap();
        assert_eq!(config.sync.batch_size, MAX_BATCH_SIZE);

        config.sync.batch_size = 0;
        config.validate().unwrap();
        assert_eq!(config.sync.batch_size, 1);
    }

    #[test]
    fn test_backend_url_must_be_http() {
        let mut config = SyncConfig::default();
        config.backend.url = Some("ftp://backend.example".into());
        assert!(config.validate().is_err());

        config.backend.url = Some("not a url".into());
        assert!(config.validate().is_err());

        config.backend.url = Some("https://xyz.example.co".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let mut config = SyncConfig::default();
        config.apply_overrides(lookup(&[
            (BACKEND_URL_ENV, "https://xyz.example.co"),
            (API_KEY_ENV, "anon"),
            (SYNC_MODE_ENV, "auto"),
            (BATCH_SIZE_ENV, "75"),
            (SYNC_INTERVAL_ENV, "not-a-number"),
            (STORE_ID_ENV, "salmiya"),
        ]));

        assert!(config.has_backend());
        assert_eq!(config.mode(), SyncMode::Auto);
        assert_eq!(config.sync.batch_size, 75);
        assert_eq!(config.sync.interval_secs, 300);
        assert_eq!(config.store.id, "salmiya");
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = SyncConfig::default();
        config.backend.url = Some("https://xyz.example.co".into());
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[backend]"));
        assert!(toml_str.contains("[sync]"));

        let parsed: SyncConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.backend.url, config.backend.url);
        assert_eq!(parsed.sync.batch_size, 50);
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("optipos-sync-{}", uuid::Uuid::new_v4()));
        let path = dir.join("sync.toml");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, "[sync]\nmode = \"offline\"\nbatch_size = 10\n").unwrap();

        let config = SyncConfig::load(Some(path)).unwrap();
        assert_eq!(config.mode(), SyncMode::Offline);
        assert_eq!(config.batch_size(), 10);
        assert!(!config.is_sync_enabled());

        let _ = std::fs::remove_dir_all(dir);
    }
}
