//! Configuration for the fleet dashboard

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root of the REST backend
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Root of the push-notification channel
    #[serde(default = "default_ws_base_url")]
    pub ws_base_url: String,

    /// Path prefix of the progress channel; the session id is the last segment
    #[serde(default = "default_progress_path")]
    pub progress_path: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_ws_base_url() -> String {
    "ws://localhost:8000".to_string()
}

fn default_progress_path() -> String {
    "/excel/ws".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            ws_base_url: default_ws_base_url(),
            progress_path: default_progress_path(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Load config from `path`, else the first default location that exists,
    /// else built-in defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            return Self::read(config_path);
        }

        let default_paths = [
            dirs::config_dir().map(|p| p.join("fleet-dashboard").join("config.yml")),
            Some(PathBuf::from("fleet-dashboard.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::read(path);
            }
        }

        Ok(Config::default())
    }

    fn read(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).wrap_err_with(|| format!("Failed to read config {}", path.display()))?;
        let config: Config =
            serde_yaml::from_str(&content).wrap_err_with(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
