use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_WAIT_MINUTES: f64 = 30.0;
pub const DEFAULT_HISTORY_CAP: usize = 20;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub storage: Option<StorageSection>,
    #[serde(default)]
    pub forecaster: Option<ForecasterSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port to listen on (default: 8080)
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSection {
    /// Directory holding the persisted blobs (default: "data")
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ForecasterSection {
    /// Fallback wait time when a clinic has no accumulated observations
    pub default_wait_minutes: Option<f64>,
    /// Cap on the recent-history window kept per clinic
    pub history_cap: Option<usize>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

impl Config {
    /// Returns the server port (default: 8080)
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    /// Returns the blob storage directory (default: "data")
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .as_ref()
            .and_then(|s| s.data_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
    }

    /// Returns the fallback wait time in minutes (default: 30.0)
    pub fn default_wait_minutes(&self) -> f64 {
        self.forecaster
            .as_ref()
            .and_then(|s| s.default_wait_minutes)
            .unwrap_or(DEFAULT_WAIT_MINUTES)
    }

    /// Returns the recent-history window cap (default: 20)
    pub fn history_cap(&self) -> usize {
        self.forecaster
            .as_ref()
            .and_then(|s| s.history_cap)
            .unwrap_or(DEFAULT_HISTORY_CAP)
    }
}
