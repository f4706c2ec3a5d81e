//! Bench configuration parsing (config.toml in the data directory)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::share::ShareTiming;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Tool configuration from `<data_dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BenchConfig {
    pub server: ServerSection,
    pub share: ShareSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Origin of the install service, also embedded in share commands.
    pub origin: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            origin: default_origin(),
        }
    }
}

fn default_origin() -> String {
    "http://127.0.0.1:8000".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareSection {
    pub debounce_ms: u64,
    pub follow_up_ms: u64,
    pub retry_ms: u64,
}

impl Default for ShareSection {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            follow_up_ms: 100,
            retry_ms: 2000,
        }
    }
}

impl BenchConfig {
    /// Load config from a data directory. A missing file yields defaults.
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = data_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn share_timing(&self) -> ShareTiming {
        ShareTiming {
            debounce: Duration::from_millis(self.share.debounce_ms),
            follow_up: Duration::from_millis(self.share.follow_up_ms),
            retry: Duration::from_millis(self.share.retry_ms),
        }
    }
}

/// Default data directory: `~/.packbench`.
pub fn default_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot find home directory");
    home.join(".packbench")
}
