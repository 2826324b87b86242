// ABOUTME: Configuration management for the renewd application
// ABOUTME: Handles loading and merging configuration from files and environment variables

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the task snapshot and per-task logs.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory where run screenshots are written.
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,

    /// Base URL of the browser-driver sidecar service.
    #[serde(default = "default_driver_url")]
    pub driver_url: String,

    /// Upper bound on workflow runs executing at once across all tasks.
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_screenshot_dir() -> PathBuf {
    PathBuf::from("data/screenshots")
}

fn default_driver_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_max_concurrent_runs() -> usize {
    4
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            screenshot_dir: default_screenshot_dir(),
            driver_url: default_driver_url(),
            max_concurrent_runs: default_max_concurrent_runs(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit path or the default locations,
    /// then apply environment variable overrides.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => Self::find_config_file(),
        };

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            serde_yaml::from_str(&contents)?
        } else {
            Config::default()
        };

        config.merge_env();
        Ok(config)
    }

    fn find_config_file() -> PathBuf {
        let local = PathBuf::from("renewd.yaml");
        if local.exists() {
            return local;
        }
        if let Some(home) = std::env::var_os("HOME") {
            let user = PathBuf::from(home).join(".config/renewd/config.yaml");
            if user.exists() {
                return user;
            }
        }
        local
    }

    fn merge_env(&mut self) {
        if let Ok(dir) = std::env::var("RENEWD_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("RENEWD_SCREENSHOT_DIR") {
            self.screenshot_dir = PathBuf::from(dir);
        }
        if let Ok(url) = std::env::var("RENEWD_DRIVER_URL") {
            self.driver_url = url;
        }
        if let Ok(level) = std::env::var("RENEWD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(limit) = std::env::var("RENEWD_MAX_CONCURRENT_RUNS") {
            if let Ok(parsed) = limit.parse() {
                self.max_concurrent_runs = parsed;
            }
        }
    }
}
