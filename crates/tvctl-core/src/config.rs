//! Client configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/tvctl/config.toml)
//! 3. Environment variables (TVCTL_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::gateway::DEFAULT_UPLOAD_TIMEOUT;
use crate::paging::DEFAULT_PAGE_SIZE;
use crate::task::{PollConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL};

/// Environment variable prefix
const ENV_PREFIX: &str = "TVCTL";

/// Server used when nothing else is configured
pub const DEFAULT_SERVER_URL: &str = "http://localhost:9191";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the service (the API lives under `/api/`)
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Session access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Seconds between task status polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Status polls before a task is reported as timed out
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,

    /// Deadline for file uploads, in seconds
    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,

    /// Rows per page for list commands
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Write logs here instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            token: None,
            poll_interval_secs: default_poll_interval_secs(),
            poll_max_attempts: default_poll_max_attempts(),
            upload_timeout_secs: default_upload_timeout_secs(),
            page_size: default_page_size(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (TVCTL_SERVER_URL, TVCTL_TOKEN, ...)
    /// 2. Config file (~/.config/tvctl/config.toml or TVCTL_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from the `--config` path when one was given
    pub fn load_with_cli_override(config_path: Option<&PathBuf>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a TOML string
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(val) = env_var("SERVER_URL") {
            self.server_url = val;
        }

        // An empty token clears it
        if let Some(val) = env_var("TOKEN") {
            self.token = if val.is_empty() { None } else { Some(val) };
        }

        if let Some(val) = env_var("POLL_INTERVAL_SECS") {
            self.poll_interval_secs = parse_env("POLL_INTERVAL_SECS", &val)?;
        }

        if let Some(val) = env_var("POLL_MAX_ATTEMPTS") {
            self.poll_max_attempts = parse_env("POLL_MAX_ATTEMPTS", &val)?;
        }

        if let Some(val) = env_var("UPLOAD_TIMEOUT_SECS") {
            self.upload_timeout_secs = parse_env("UPLOAD_TIMEOUT_SECS", &val)?;
        }

        if let Some(val) = env_var("PAGE_SIZE") {
            self.page_size = parse_env("PAGE_SIZE", &val)?;
        }

        Ok(())
    }

    /// Set a single key from its string form (`tvctl config set`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "server_url" => self.server_url = value.trim_end_matches('/').to_string(),
            "token" => self.token = if value.is_empty() { None } else { Some(value.to_string()) },
            "poll_interval_secs" => self.poll_interval_secs = parse_value(key, value)?,
            "poll_max_attempts" => self.poll_max_attempts = parse_value(key, value)?,
            "upload_timeout_secs" => self.upload_timeout_secs = parse_value(key, value)?,
            "page_size" => self.page_size = parse_value(key, value)?,
            "log_file" => {
                self.log_file = if value.is_empty() { None } else { Some(PathBuf::from(value)) }
            }
            _ => bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with TVCTL_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Some(path) = env_var("CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tvctl")
            .join("config.toml")
    }

    /// Poll cadence for long-running tasks
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.poll_max_attempts.max(1),
        }
    }

    /// Deadline for uploads; never shorter than one second
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs.max(1))
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, suffix)).ok()
}

fn parse_env<T: std::str::FromStr>(suffix: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid value for {}_{}: {:?}", ENV_PREFIX, suffix, value))
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid value for {}: {:?}", key, value))
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_poll_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_upload_timeout_secs() -> u64 {
    DEFAULT_UPLOAD_TIMEOUT.as_secs()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}
