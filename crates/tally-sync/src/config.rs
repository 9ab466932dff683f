//! # Station Configuration
//!
//! Process-level configuration for the sync engine and local storage.
//!
//! Where the remote store lives (URL, secret, on/off) is business data and
//! sits in `Settings.cloudSync`; this file only covers how this station runs.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_DEVICE_ID=register-1                                         │
//! │     TALLY_SYNC_INTERVAL_SECS=60                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tally/station.toml (Linux)                               │
//! │     ~/Library/Application Support/com.tally.pos/station.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     30s interval, 3s debounce, generated device id                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! name = "Register 1"
//!
//! [sync]
//! enabled = true
//! interval_secs = 30
//! debounce_ms = 3000
//! request_timeout_secs = 15
//! persist_debounce_ms = 250
//!
//! [storage]
//! database_path = "/var/lib/tally/tally.db"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Device Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique device identifier. Generated on first run if not provided.
    pub id: String,

    /// Human-readable name (e.g., "Register 1").
    #[serde(default = "default_device_name")]
    pub name: String,
}

fn default_device_name() -> String {
    "Tally Station".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            id: Uuid::new_v4().to_string(),
            name: default_device_name(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Timing of the scheduler, the transport and the persistence writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Station-wide switch. When false the scheduler never starts.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Interval trigger: push when dirty, pull otherwise (seconds).
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Quiet window after the last mutation before a push (milliseconds).
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    /// Timeout for one push or pull request (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Coalescing window of the persistence writer (milliseconds).
    #[serde(default = "default_persist_debounce")]
    pub persist_debounce_ms: u64,
}

fn default_true() -> bool {
    true
}
fn default_interval() -> u64 {
    30
}
fn default_debounce() -> u64 {
    3_000
}
fn default_request_timeout() -> u64 {
    15
}
fn default_persist_debounce() -> u64 {
    250
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            enabled: true,
            interval_secs: default_interval(),
            debounce_ms: default_debounce(),
            request_timeout_secs: default_request_timeout(),
            persist_debounce_ms: default_persist_debounce(),
        }
    }
}

impl SyncSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn persist_debounce(&self) -> Duration {
        Duration::from_millis(self.persist_debounce_ms)
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

impl SyncConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (station.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading station config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load station config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Like [`SyncConfig::load`], then writes the file when it did not exist
    /// yet, so a generated device id stays the same across restarts.
    pub fn load_or_create(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let path = config_path.or_else(Self::default_config_path);
        let existed = path.as_ref().is_some_and(|p| p.exists());
        let config = Self::load(path.clone())?;
        if !existed {
            if let Err(e) = config.save(path) {
                warn!(error = %e, "Could not write initial station config");
            }
        }
        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Station config saved");
        Ok(())
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.device.id.trim().is_empty() {
            return Err(SyncError::InvalidConfig("device.id must not be empty".into()));
        }
        if self.sync.interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "interval_secs must be greater than 0".into(),
            ));
        }
        if self.sync.debounce_ms == 0 {
            return Err(SyncError::InvalidConfig(
                "debounce_ms must be greater than 0".into(),
            ));
        }
        if self.sync.request_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("TALLY_DEVICE_ID") {
            debug!(device_id = %id, "Overriding device ID from environment");
            self.device.id = id;
        }

        if let Ok(path) = std::env::var("TALLY_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.database_path = Some(PathBuf::from(path));
        }

        if let Some(v) = env_u64("TALLY_SYNC_INTERVAL_SECS") {
            self.sync.interval_secs = v;
        }
        if let Some(v) = env_u64("TALLY_SYNC_DEBOUNCE_MS") {
            self.sync.debounce_ms = v;
        }
        if let Some(v) = env_u64("TALLY_SYNC_TIMEOUT_SECS") {
            self.sync.request_timeout_secs = v;
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "pos")
            .map(|dirs| dirs.config_dir().join("station.toml"))
    }

    /// Database file to open: configured path or the platform data dir.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.storage.database_path {
            return path.clone();
        }
        directories::ProjectDirs::from("com", "tally", "pos")
            .map(|dirs| dirs.data_dir().join("tally.db"))
            .unwrap_or_else(|| PathBuf::from("tally.db"))
    }

    pub fn device_id(&self) -> &str {
        &self.device.id
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(v) => {
            debug!(var = name, value = v, "Overriding from environment");
            Some(v)
        }
        Err(_) => {
            warn!(var = name, value = %raw, "Ignoring non-numeric environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert!(!config.device.id.is_empty());
        assert_eq!(config.sync.interval(), Duration::from_secs(30));
        assert_eq!(config.sync.debounce(), Duration::from_millis(3_000));
        assert!(config.sync.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();
        config.device.id = "  ".to_string();
        assert!(config.validate().unwrap_err().is_config_error());

        config.device.id = "register-1".to_string();
        config.sync.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SyncConfig = toml::from_str(
            r#"
            [device]
            id = "register-2"

            [sync]
            debounce_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.device.id, "register-2");
        assert_eq!(config.device.name, "Tally Station");
        assert_eq!(config.sync.debounce_ms, 500);
        assert_eq!(config.sync.interval_secs, 30);
        assert!(config.storage.database_path.is_none());
    }

    #[test]
    fn test_toml_round_trip_and_explicit_db_path() {
        let mut config = SyncConfig::default();
        config.storage.database_path = Some(PathBuf::from("/tmp/tally-test.db"));
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[device]"));
        assert!(toml_str.contains("[sync]"));

        let back: SyncConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.database_path(), PathBuf::from("/tmp/tally-test.db"));
    }

    #[test]
    fn test_load_or_create_keeps_device_id() {
        let dir = std::env::temp_dir().join(format!("tally-config-{}", Uuid::new_v4()));
        let path = dir.join("station.toml");

        let first = SyncConfig::load_or_create(Some(path.clone())).unwrap();
        assert!(path.exists());
        let second = SyncConfig::load_or_create(Some(path)).unwrap();
        if std::env::var("TALLY_DEVICE_ID").is_err() {
            assert_eq!(first.device.id, second.device.id);
        }

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = std::env::temp_dir().join(format!("tally-config-{}", Uuid::new_v4()));
        let path = dir.join("station.toml");

        let mut config = SyncConfig::default();
        config.device.id = "register-9".into();
        config.sync.interval_secs = 90;
        config.save(Some(path.clone())).unwrap();

        let loaded: SyncConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.device.id, "register-9");
        assert_eq!(loaded.sync.interval_secs, 90);

        let _ = std::fs::remove_dir_all(dir);
    }
}
