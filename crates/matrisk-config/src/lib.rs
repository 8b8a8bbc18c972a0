//! Application configuration for matrisk.
//!
//! [`AppConfig`] is resolved in three layers:
//!
//! 1. Built-in defaults (port 5000 on all interfaces, relative `models/` and
//!    `data/` paths, seed 42, 1000 synthetic rows)
//! 2. An optional JSON file named by `MATRISK_CONFIG`
//! 3. Environment overrides (`MATRISK_HOST`, `MATRISK_PORT`,
//!    `MATRISK_MODEL_PATH`, `MATRISK_DATASET_PATH`, `MATRISK_DEBUG`)
//!
//! # Example
//!
//! ```rust
//! use matrisk_config::AppConfig;
//!
//! let config = AppConfig::default();
//! assert_eq!(config.bind_addr(), "0.0.0.0:5000");
//! assert_eq!(config.synthetic.seed, 42);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors that can occur when loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse JSON configuration.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment override had an unusable value.
    #[error("Invalid value '{value}' for {key}")]
    InvalidOverride { key: String, value: String },
}

impl ConfigError {
    /// Creates an IO error with path context.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Parameters of the demo data synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub samples: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self { seed: 42, samples: 1000 }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Serialized model bundle.
    pub model_path: PathBuf,
    /// Flat tabular dataset used for training.
    pub dataset_path: PathBuf,
    /// Directory served under `/static`.
    pub static_dir: PathBuf,
    pub templates_dir: PathBuf,
    /// Development mode: verbose default logging.
    pub debug: bool,
    pub synthetic: SyntheticConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            model_path: PathBuf::from("models/trained_model.json"),
            dataset_path: PathBuf::from("data/pregnancy_data.csv"),
            static_dir: PathBuf::from("static"),
            templates_dir: PathBuf::from("templates"),
            debug: true,
            synthetic: SyntheticConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads a configuration from a JSON file; missing keys take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        Self::from_json(&content)
    }

    /// Parses a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolves the configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var("MATRISK_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `MATRISK_*` overrides using the given lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("MATRISK_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("MATRISK_PORT") {
            self.port = port.parse().map_err(|_| ConfigError::InvalidOverride {
                key: "MATRISK_PORT".into(),
                value: port,
            })?;
        }
        if let Some(path) = lookup("MATRISK_MODEL_PATH") {
            self.model_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("MATRISK_DATASET_PATH") {
            self.dataset_path = PathBuf::from(path);
        }
        if let Some(debug) = lookup("MATRISK_DEBUG") {
            self.debug = parse_flag(&debug).ok_or(ConfigError::InvalidOverride {
                key: "MATRISK_DEBUG".into(),
                value: debug,
            })?;
        }
        Ok(self)
    }

    /// Address the HTTP listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Directories that must exist before serving.
    pub fn required_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Some(parent) = self.model_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            dirs.push(parent.to_path_buf());
        }
        dirs.push(self.static_dir.join("css"));
        dirs.push(self.static_dir.join("js"));
        dirs.push(self.templates_dir.clone());
        if let Some(parent) = self.dataset_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            dirs.push(parent.to_path_buf());
        }
        dirs
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
