//! Server configuration loaded from a TOML file.
//!
//! Every section has sensible defaults, so a missing section (or an entirely
//! empty file) yields a runnable local setup: listen on localhost, world
//! definition under `./world`, saves under `./data`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ghosts: GhostsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address, e.g. "127.0.0.1:4000".
    pub bind: String,
    /// Hard cap on simultaneously connected sockets; further connects are
    /// refused with an error line.
    pub max_connections: usize,
    /// Optional banner pushed to every new connection before character
    /// selection. Empty disables it.
    #[serde(default)]
    pub motd: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:4000".to_string(),
            max_connections: 64,
            motd: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Directory holding world.json, characters.json and verbs.json.
    pub data_dir: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            data_dir: "./world".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for the sled snapshot database.
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level when no -v flags are given: error, warn, info, debug, trace.
    pub level: String,
    /// Optional log file; stdout stays active when it is a terminal.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("undercroft.log".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GhostsConfig {
    /// Master switch for ghost movement.
    pub enabled: bool,
    /// Shortest wait between ghost waves, in seconds.
    pub min_interval_secs: u64,
    /// Longest wait between ghost waves, in seconds.
    pub max_interval_secs: u64,
}

impl Default for GhostsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_interval_secs: 8,
            max_interval_secs: 20,
        }
    }
}

impl GhostsConfig {
    /// Sanitized (min, max) wait in seconds. Zeroes are raised to one
    /// second and a swapped pair is reordered rather than rejected.
    pub fn interval_bounds(&self) -> (u64, u64) {
        let min = self.min_interval_secs.max(1);
        let max = self.max_interval_secs.max(min);
        (min, max)
    }
}

impl Config {
    /// Read and parse a configuration file.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path))?;
        Ok(config)
    }

    /// Write a config file populated with the defaults.
    pub async fn create_default(path: &str) -> Result<()> {
        let content = toml::to_string_pretty(&Config::default())
            .context("Failed to serialize default config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config file {}", path))?;
        Ok(())
    }

    /// Log level filter derived from the configured level string, with an
    /// info fallback for unrecognized values.
    pub fn level_filter(&self) -> log::LevelFilter {
        match self.logging.level.to_ascii_lowercase().as_str() {
            "error" => log::LevelFilter::Error,
            "warn" => log::LevelFilter::Warn,
            "info" => log::LevelFilter::Info,
            "debug" => log::LevelFilter::Debug,
            "trace" => log::LevelFilter::Trace,
            "off" => log::LevelFilter::Off,
            _ => log::LevelFilter::Info,
        }
    }
}
