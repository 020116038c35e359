//! `caseflow.toml` loading.
//!
//! Resolution: `--config <path>` > `./caseflow.toml` > built-in defaults.
//! The store root can then be overridden by `CASEFLOW_ROOT` and by `--root`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "caseflow.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub notifications: NotificationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Cases live under `<root>/cases/`.
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { root: PathBuf::from("runtime") }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    /// JSONL outbox; without one, notifications only go to the log.
    pub outbox: Option<PathBuf>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { enabled: true, outbox: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_string() }
    }
}

pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
}

pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    match explicit {
        Some(p) => parse_config(p),
        None if Path::new(CONFIG_FILE).exists() => parse_config(Path::new(CONFIG_FILE)),
        None => Ok(Config::default()),
    }
}

/// `flag` beats `env`, which beats the configured root. Blank env values are ignored.
pub fn resolve_root(configured: &Path, env: Option<String>, flag: Option<PathBuf>) -> PathBuf {
    if let Some(f) = flag {
        return f;
    }
    match env {
        Some(e) if !e.trim().is_empty() => PathBuf::from(e.trim()),
        _ => configured.to_path_buf(),
    }
}
