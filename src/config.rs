//! Application configuration.
//!
//! Values come from, in increasing priority: built-in defaults, a TOML file
//! (`$FILER_CONFIG` or `<config dir>/filer-terminal/config.toml`), and the
//! `FILER_ROOT`, `FILER_PASSWORD` and `FILER_LOG` environment variables. A
//! `.env` file in the working directory can seed those variables through
//! [`load_env_file`].

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage_root: Option<PathBuf>,
    /// When set, the terminal stays locked until this password is entered.
    pub password: Option<String>,
    pub web: WebConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub search_url: String,
    /// How many anchors of the search page are inspected.
    pub search_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: BROWSER_USER_AGENT.to_string(),
            search_url: "https://www.google.com/search?q=".to_string(),
            search_limit: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load the config file if one exists, then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_file_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(root) = env::var("FILER_ROOT") {
            self.storage_root = Some(PathBuf::from(root));
        }
        if let Ok(password) = env::var("FILER_PASSWORD") {
            self.password = Some(password);
        }
        if let Ok(level) = env::var("FILER_LOG") {
            self.logging.level = level;
        }
    }

    /// Configured root, or `~/Documents/MyFiles`.
    pub fn storage_root(&self) -> Result<PathBuf, ConfigError> {
        if let Some(root) = &self.storage_root {
            return Ok(root.clone());
        }
        dirs::document_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Documents")))
            .map(|documents| documents.join("MyFiles"))
            .ok_or(ConfigError::NoStorageRoot)
    }
}

/// Load `.env` from the working directory into the environment.
///
/// A missing file is fine; a malformed one is returned so the caller can log
/// it once logging is up.
pub fn load_env_file() -> Result<(), dotenvy::Error> {
    missing_is_fine(dotenvy::dotenv().map(|_| ()))
}

fn missing_is_fine(result: Result<(), dotenvy::Error>) -> Result<(), dotenvy::Error> {
    match result {
        Err(e) if e.not_found() => Ok(()),
        other => other,
    }
}

fn config_file_path() -> Option<PathBuf> {
    match env::var("FILER_CONFIG") {
        Ok(path) => Some(PathBuf::from(path)),
        Err(_) => dirs::config_dir().map(|dir| dir.join("filer-terminal").join("config.toml")),
    }
}
