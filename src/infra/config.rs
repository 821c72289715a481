//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::types::{TieBreak, Zone};
use anyhow::Context;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_db_path() -> String {
    "parking.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ZonesConfig {
    /// Zone name to seeded slot count (e.g. A = 50)
    #[serde(default)]
    pub counts: HashMap<String, u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AllocationConfig {
    #[serde(default)]
    pub tie_break: TieBreak,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Closed history rows older than this are eligible for purge
    #[serde(default = "default_history_days")]
    pub history_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            history_days: default_history_days(),
        }
    }
}

fn default_history_days() -> u32 {
    90
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub zones: ZonesConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    db_path: PathBuf,
    busy_timeout: Duration,
    zone_counts: BTreeMap<Zone, u32>,
    tie_break: TieBreak,
    history_days: u32,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(default_db_path()),
            busy_timeout: Duration::from_millis(default_busy_timeout_ms()),
            zone_counts: Self::default_zone_counts(),
            tie_break: TieBreak::First,
            history_days: default_history_days(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    fn default_zone_counts() -> BTreeMap<Zone, u32> {
        BTreeMap::from([
            (Zone::new("A"), 50),
            (Zone::new("B"), 30),
            (Zone::new("C"), 20),
        ])
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let zone_counts = if toml_config.zones.counts.is_empty() {
            Self::default_zone_counts()
        } else {
            toml_config
                .zones
                .counts
                .into_iter()
                .map(|(name, count)| (Zone::new(name), count))
                .collect()
        };

        Ok(Self {
            db_path: PathBuf::from(toml_config.storage.path),
            busy_timeout: Duration::from_millis(toml_config.storage.busy_timeout_ms),
            zone_counts,
            tie_break: toml_config.allocation.tie_break,
            history_days: toml_config.retention.history_days,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    pub fn zone_counts(&self) -> &BTreeMap<Zone, u32> {
        &self.zone_counts
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    pub fn history_days(&self) -> u32 {
        self.history_days
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.db_path(), Path::new("parking.db"));
        assert_eq!(config.busy_timeout(), Duration::from_millis(5000));
        assert_eq!(config.tie_break(), TieBreak::First);
        assert_eq!(config.history_days(), 90);
        assert_eq!(config.zone_counts().get(&Zone::new("A")), Some(&50));
        assert_eq!(config.zone_counts().get(&Zone::new("B")), Some(&30));
        assert_eq!(config.zone_counts().get(&Zone::new("C")), Some(&20));
    }

    #[test]
    fn test_zone_counts_default_when_unset() {
        let config = Config::default();
        assert_eq!(config.zone_counts().len(), 3);
    }
}
