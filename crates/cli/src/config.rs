//! Host configuration for the `stepflow` binary.
//!
//! Settings live in a small JSON file under the standard configuration
//! directory (`~/.config/stepflow/config.json` on most platforms). The
//! `STEPFLOW_CONFIG_PATH` environment variable points at another file.

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use dirs_next::{config_dir, home_dir};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "STEPFLOW_CONFIG_PATH";

pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepflowConfig {
    /// Deadline applied to every activity invocation, in seconds.
    pub activity_timeout_secs: u64,
    /// Tracing filter used when `RUST_LOG` is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
    /// Whether the bundled sample activities simulate latency.
    pub sample_activity_delays: bool,
}

impl Default for StepflowConfig {
    fn default() -> Self {
        Self {
            activity_timeout_secs: 60,
            log_filter: None,
            sample_activity_delays: true,
        }
    }
}

impl StepflowConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(&default_config_path())
    }

    /// Reads `path`, falling back to defaults when the file is missing or unparsable.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => Ok(config),
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        error = %error,
                        "Failed to parse config file; using defaults"
                    );
                    Ok(Self::default())
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(ConfigError::Io(error)),
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn activity_timeout(&self) -> Duration {
        Duration::from_secs(self.activity_timeout_secs)
    }
}

/// Path of the configuration file, honouring [`CONFIG_PATH_ENV`].
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stepflow")
        .join(CONFIG_FILE_NAME)
}

fn expand_tilde(path: &str) -> PathBuf {
    let path = path.trim();
    if path == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(path)
}
