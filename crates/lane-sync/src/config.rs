//! # Sync Configuration
//!
//! Configuration management for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     LANE_CENTRAL_URL=https://central.example.com                       │
//! │     LANE_DB_PATH=/var/lib/lane/lane.db                                 │
//! │     LANE_CONNECTIVITY_INTERVAL_SECS=30                                 │
//! │     LANE_CATALOG_INTERVAL_SECS=14400                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $LANE_CONFIG, or                                                   │
//! │     ~/.config/lane-pos/lane.toml (Linux)                               │
//! │     ~/Library/Application Support/com.lane.pos/lane.toml (macOS)       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # lane.toml
//! [central]
//! base_url = "http://localhost:8080"
//! health_timeout_secs = 5
//! fetch_timeout_secs = 30
//! push_timeout_secs = 10
//!
//! [schedule]
//! connectivity_interval_secs = 30
//! catalog_interval_secs = 14400
//!
//! [store]
//! database_path = "/var/lib/lane/lane.db"
//! ```
//!
//! The configuration is read once at startup and is immutable afterwards.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "LANE_CONFIG";

/// Longest accepted loop interval: one week.
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Longest accepted request timeout: one hour.
pub const MAX_TIMEOUT_SECS: u64 = 60 * 60;

/// Bounds a loop period to what the tokio timers accept.
pub(crate) fn clamp_period(period: Duration) -> Duration {
    period.clamp(Duration::from_millis(1), Duration::from_secs(MAX_INTERVAL_SECS))
}

// =============================================================================
// Central Service Settings
// =============================================================================

/// Where the central service lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CentralSettings {
    /// Base URL; endpoint paths are joined onto it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Deadline for one health probe.
    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u64,

    /// Deadline for one catalog download.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Deadline for one transaction upload.
    #[serde(default = "default_push_timeout")]
    pub push_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_health_timeout() -> u64 {
    5
}
fn default_fetch_timeout() -> u64 {
    30
}
fn default_push_timeout() -> u64 {
    10
}

impl Default for CentralSettings {
    fn default() -> Self {
        CentralSettings {
            base_url: default_base_url(),
            health_timeout_secs: default_health_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
            push_timeout_secs: default_push_timeout(),
        }
    }
}

impl CentralSettings {
    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout_secs)
    }
}

// =============================================================================
// Schedule Settings
// =============================================================================

/// Periods of the background loops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// Seconds between health probes.
    #[serde(default = "default_connectivity_interval")]
    pub connectivity_interval_secs: u64,

    /// Seconds between catalog pulls (4 hours by default).
    #[serde(default = "default_catalog_interval")]
    pub catalog_interval_secs: u64,
}

fn default_connectivity_interval() -> u64 {
    30
}
fn default_catalog_interval() -> u64 {
    4 * 60 * 60
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        ScheduleSettings {
            connectivity_interval_secs: default_connectivity_interval(),
            catalog_interval_secs: default_catalog_interval(),
        }
    }
}

// =============================================================================
// Store Settings
// =============================================================================

/// Local Store location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub central: CentralSettings,

    #[serde(default)]
    pub schedule: ScheduleSettings,

    #[serde(default)]
    pub store: StoreSettings,
}

impl SyncConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file: `config_path`, else `$LANE_CONFIG`, else the
    ///    platform config directory (`lane.toml`)
    /// 3. Environment variables
    ///
    /// A missing file is not an error; an unreadable or malformed one is.
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
            .or_else(Self::default_config_path);

        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading sync config from file");
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

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let url = Url::parse(&self.central.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SyncError::InvalidUrl(format!(
                "Central URL must start with http:// or https://, got: {}",
                self.central.base_url
            )));
        }

        let bounded = [
            ("central.health_timeout_secs", self.central.health_timeout_secs, MAX_TIMEOUT_SECS),
            ("central.fetch_timeout_secs", self.central.fetch_timeout_secs, MAX_TIMEOUT_SECS),
            ("central.push_timeout_secs", self.central.push_timeout_secs, MAX_TIMEOUT_SECS),
            (
                "schedule.connectivity_interval_secs",
                self.schedule.connectivity_interval_secs,
                MAX_INTERVAL_SECS,
            ),
            (
                "schedule.catalog_interval_secs",
                self.schedule.catalog_interval_secs,
                MAX_INTERVAL_SECS,
            ),
        ];
        for (field, value, max) in bounded {
            if value == 0 || value > max {
                return Err(SyncError::InvalidConfig(format!(
                    "{field} must be between 1 and {max}, got {value}"
                )));
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `LANE_*` overrides read through `lookup`.
    ///
    /// Unparseable numbers are logged and ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("LANE_CENTRAL_URL") {
            debug!(url = %url, "Overriding central URL from environment");
            self.central.base_url = url;
        }

        if let Some(path) = lookup("LANE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.store.database_path = Some(PathBuf::from(path));
        }

        if let Some(secs) = lookup("LANE_CONNECTIVITY_INTERVAL_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.schedule.connectivity_interval_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring invalid LANE_CONNECTIVITY_INTERVAL_SECS"),
            }
        }

        if let Some(secs) = lookup("LANE_CATALOG_INTERVAL_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.schedule.catalog_interval_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring invalid LANE_CATALOG_INTERVAL_SECS"),
            }
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "lane", "pos")
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("lane.toml"))
    }

    /// Resolved Local Store path: configured, else the platform data
    /// directory.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.store
            .database_path
            .clone()
            .or_else(|| Self::project_dirs().map(|dirs| dirs.data_dir().join("lane.db")))
    }

    pub fn connectivity_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.connectivity_interval_secs)
    }

    pub fn catalog_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.catalog_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.central.health_timeout_secs, 5);
        assert_eq!(config.central.fetch_timeout_secs, 30);
        assert_eq!(config.central.push_timeout_secs, 10);
        assert_eq!(config.connectivity_interval(), Duration::from_secs(30));
        assert_eq!(config.catalog_interval(), Duration::from_secs(14_400));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: SyncConfig = toml::from_str(
            r#"
            [central]
            base_url = "https://central.example.com"

            [store]
            database_path = "/tmp/lane.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.central.base_url, "https://central.example.com");
        assert_eq!(config.central.push_timeout_secs, 10);
        assert_eq!(config.schedule.catalog_interval_secs, 14_400);
        assert_eq!(config.database_path(), Some(PathBuf::from("/tmp/lane.db")));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("LANE_CENTRAL_URL", "http://10.0.0.5:9000"),
            ("LANE_DB_PATH", "/data/lane.db"),
            ("LANE_CONNECTIVITY_INTERVAL_SECS", "10"),
            ("LANE_CATALOG_INTERVAL_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = SyncConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.central.base_url, "http://10.0.0.5:9000");
        assert_eq!(config.store.database_path, Some(PathBuf::from("/data/lane.db")));
        assert_eq!(config.schedule.connectivity_interval_secs, 10);
        assert_eq!(config.schedule.catalog_interval_secs, 14_400);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = SyncConfig::default();
        config.central.base_url = "ws://central:8080".into();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.central.base_url = "not a url".into();
        assert!(config.validate().unwrap_err().is_config_error());

        let mut config = SyncConfig::default();
        config.schedule.connectivity_interval_secs = 0;
        assert!(matches!(config.validate(), Err(SyncError::InvalidConfig(_))));
    }

    #[test]
    fn test_validation_bounds_intervals_and_timeouts() {
        let mut config = SyncConfig::default();
        config.schedule.catalog_interval_secs = u64::MAX;
        assert!(matches!(config.validate(), Err(SyncError::InvalidConfig(_))));

        config.schedule.catalog_interval_secs = MAX_INTERVAL_SECS;
        assert!(config.validate().is_ok());

        let mut config = SyncConfig::default();
        config.central.push_timeout_secs = MAX_TIMEOUT_SECS + 1;
        assert!(matches!(config.validate(), Err(SyncError::InvalidConfig(_))));

        let env: HashMap<&str, &str> =
            [("LANE_CATALOG_INTERVAL_SECS", "18446744073709551615")].into_iter().collect();
        let mut config = SyncConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_clamp_period() {
        assert_eq!(clamp_period(Duration::ZERO), Duration::from_millis(1));
        assert_eq!(clamp_period(Duration::MAX), Duration::from_secs(MAX_INTERVAL_SECS));
        assert_eq!(clamp_period(Duration::from_secs(30)), Duration::from_secs(30));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("lane-sync-test-does-not-exist.toml");
        let config = SyncConfig::load(Some(path)).unwrap();
        assert_eq!(config.schedule, ScheduleSettings::default());
    }
}
