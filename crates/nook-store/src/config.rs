//! Store configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Result, StoreError};

/// Complete store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Profile directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
    /// Fixed block store key holding the live snapshot.
    #[serde(default = "default_snapshot_key")]
    pub snapshot_key: String,
    /// Key under which older clients kept the snapshot in the KV area.
    #[serde(default = "default_legacy_key")]
    pub legacy_key: String,
    /// Total size cap of the synchronous KV area.
    #[serde(default = "default_kv_quota")]
    pub kv_quota_bytes: usize,
    /// Periodic reconcile interval. 0 = only on broadcast and `refresh()`.
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,
    /// Cross-window channel capacity.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
    /// Insert fixture rows into an empty engine.
    #[serde(default = "default_true")]
    pub seed_fixtures: bool,
    /// Failed-login lockout.
    #[serde(default)]
    pub lockout: LockoutConfig,
}

/// Failed-login lockout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutConfig {
    /// Failures allowed inside the window before the account locks.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Lockout window in seconds, measured from the first failure.
    #[serde(default = "default_lockout_window")]
    pub window_secs: u64,
}

// Default value functions

fn default_snapshot_key() -> String {
    "nook_db_snapshot".to_string()
}

fn default_legacy_key() -> String {
    "nook_db".to_string()
}

fn default_kv_quota() -> usize {
    crate::kv::DEFAULT_QUOTA_BYTES
}

fn default_reconcile_interval() -> u64 {
    30
}

fn default_broadcast_capacity() -> usize {
    crate::window::DEFAULT_CHANNEL_CAPACITY
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    5
}

fn default_lockout_window() -> u64 {
    15 * 60
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            snapshot_key: default_snapshot_key(),
            legacy_key: default_legacy_key(),
            kv_quota_bytes: default_kv_quota(),
            reconcile_interval_secs: default_reconcile_interval(),
            broadcast_capacity: default_broadcast_capacity(),
            seed_fixtures: true,
            lockout: LockoutConfig::default(),
        }
    }
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            window_secs: default_lockout_window(),
        }
    }
}

impl StoreConfig {
    /// Parse a TOML document. Missing fields take their defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Load from `path`, falling back to defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(StoreError::Config(format!("{}: {e}", path.display()))),
        }
    }

    /// Get the profile directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.data_dir.is_empty() {
            default_data_dir()
        } else {
            PathBuf::from(&self.data_dir)
        }
    }
}

/// Platform-specific default profile directory.
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("NOOK_DATA_DIR") {
        return PathBuf::from(dir);
    }
    #[cfg(target_os = "macos")]
    {
        home_fallback("Library/Application Support/Nook")
    }
    #[cfg(target_os = "windows")]
    {
        home_fallback("Nook")
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        home_fallback(".nook")
    }
}

/// Fallback home directory resolution.
fn home_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/nook"))
}
