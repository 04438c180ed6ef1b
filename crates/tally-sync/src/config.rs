//! # Tally Configuration
//!
//! Configuration for the server, database and reconciliation schedule.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_SERVER_PORT=9090                                             │
//! │     TALLY_SYNC_TIMES=04:30,12:00,18:00                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, or                                                │
//! │     ~/.config/tally/tally.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.tally.tally/tally.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! path = "/var/lib/tally/tally.db"
//! max_connections = 5
//!
//! [sync]
//! enabled = true
//! schedule = ["05:00", "17:00"]
//! max_concurrent_reconciles = 4
//! ```

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Server Settings
// =============================================================================

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Bind address (default: 0.0.0.0 for all interfaces).
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

// =============================================================================
// Database Settings
// =============================================================================

/// SQLite location and pool size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Path to the SQLite file; created on first start.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "tally", "tally")
        .map(|dirs| dirs.data_dir().join("tally.db"))
        .unwrap_or_else(|| PathBuf::from("./tally.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Reconciliation schedule and worker limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Run the daily scheduler. Manual and per-mutation syncs are unaffected.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Local wall-clock times (`HH:MM`) at which every customer is reconciled.
    #[serde(default = "default_schedule")]
    pub schedule: Vec<String>,

    /// Upper bound on background reconciliations running at once.
    #[serde(default = "default_max_concurrent_reconciles")]
    pub max_concurrent_reconciles: usize,
}

fn default_true() -> bool {
    true
}

fn default_schedule() -> Vec<String> {
    vec!["05:00".to_string(), "17:00".to_string()]
}

fn default_max_concurrent_reconciles() -> usize {
    4
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            enabled: true,
            schedule: default_schedule(),
            max_concurrent_reconciles: default_max_concurrent_reconciles(),
        }
    }
}

impl SyncSettings {
    /// Parses the schedule into sorted, de-duplicated times of day.
    pub fn schedule_times(&self) -> SyncResult<Vec<NaiveTime>> {
        let mut times = self
            .schedule
            .iter()
            .map(|s| parse_schedule_time(s))
            .collect::<SyncResult<Vec<_>>>()?;
        times.sort();
        times.dedup();
        Ok(times)
    }
}

/// Parses one `HH:MM` schedule entry.
pub fn parse_schedule_time(value: &str) -> SyncResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| SyncError::InvalidSchedule(value.to_string()))
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete Tally configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TallyConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub sync: SyncSettings,
}

impl TallyConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (tally.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
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
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.server.port == 0 {
            return Err(SyncError::InvalidConfig("server.port must be greater than 0".into()));
        }

        if self.database.max_connections == 0 {
            return Err(SyncError::InvalidConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.sync.max_concurrent_reconciles == 0 {
            return Err(SyncError::InvalidConfig(
                "sync.max_concurrent_reconciles must be greater than 0".into(),
            ));
        }

        let times = self.sync.schedule_times()?;
        if self.sync.enabled && times.is_empty() {
            return Err(SyncError::InvalidConfig(
                "sync.schedule must list at least one time when the scheduler is enabled".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(port) = var("TALLY_SERVER_PORT") {
            match port.parse::<u16>() {
                Ok(p) => {
                    debug!(port = p, "Overriding server port from environment");
                    self.server.port = p;
                }
                Err(_) => warn!(port = %port, "Ignoring invalid TALLY_SERVER_PORT"),
            }
        }

        if let Some(addr) = var("TALLY_BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        if let Some(path) = var("TALLY_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = var("TALLY_DB_MAX_CONNECTIONS") {
            if let Ok(m) = max.parse::<u32>() {
                self.database.max_connections = m;
            }
        }

        if let Some(times) = var("TALLY_SYNC_TIMES") {
            debug!(times = %times, "Overriding sync schedule from environment");
            self.sync.schedule = times
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(workers) = var("TALLY_SYNC_WORKERS") {
            if let Ok(w) = workers.parse::<usize>() {
                self.sync.max_concurrent_reconciles = w;
            }
        }

        if let Some(enabled) = var("TALLY_SYNC_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.sync.enabled = true,
                "0" | "false" | "no" | "off" => self.sync.enabled = false,
                _ => warn!(value = %enabled, "Unknown TALLY_SYNC_ENABLED value"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "tally")
            .map(|dirs| dirs.config_dir().join("tally.toml"))
    }
}
