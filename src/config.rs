//! Settings file and credential discovery
//!
//! Settings are read from `<config dir>/config.json`, where the config dir
//! defaults to `$XDG_CONFIG_HOME/clickup-toolkit` (or the platform
//! equivalent). Every field has a default, so a missing file or a partial
//! file is fine. The alias table lives next to it in `aliases.json`.
//!
//! Credentials are never stored in the settings file. They come from the
//! environment (after `.env` is loaded):
//! 1. `CLICKUP_API_KEY`
//! 2. `CLICKUP_TOKEN` or `CLICKUP_ACCESS_TOKEN`
//! 3. `CLICKUP_CLIENT_ID` + `CLICKUP_CLIENT_SECRET`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::client::config::{
    DEFAULT_BASE_URL, DEFAULT_BATCH_SIZE, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_MAX_RETRIES,
    DEFAULT_REQUESTS_PER_MINUTE, DEFAULT_TIMEOUT_SECS,
};
use crate::client::Credentials;

/// Settings file name inside the config dir
pub const SETTINGS_FILE: &str = "config.json";

/// Alias table file name inside the config dir
pub const ALIASES_FILE: &str = "aliases.json";

/// Largest settings file accepted (1 MiB)
const MAX_SETTINGS_FILE_SIZE: u64 = 1024 * 1024;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Malformed settings file
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// File that failed to parse
        path: String,
        /// Parser message
        message: String,
    },

    /// Setting out of range
    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    /// No usable credentials in the environment
    #[error("no ClickUp credentials found; set CLICKUP_API_KEY (or CLICKUP_TOKEN, or CLICKUP_CLIENT_ID and CLICKUP_CLIENT_SECRET)")]
    MissingCredentials,

    /// No platform config directory
    #[error("could not determine a configuration directory; pass --config-dir")]
    NoConfigDir,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Toolkit settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Overall request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Request ceiling used until the service reports its own
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Records per bulk batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Concurrent calls inside a bulk batch
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

// Default value functions
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_requests_per_minute() -> u32 {
    DEFAULT_REQUESTS_PER_MINUTE
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_concurrency() -> usize {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_retries: default_max_retries(),
            requests_per_minute: default_requests_per_minute(),
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
        }
    }
}

impl Settings {
    /// Load `config.json` from `dir`, falling back to defaults when it does not exist
    pub fn load(dir: &Path) -> ConfigResult<Self> {
        let path = dir.join(SETTINGS_FILE);
        if !path.exists() {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            return Ok(Self::default());
        }

        let metadata = std::fs::metadata(&path)
            .map_err(|e| ConfigError::IoError(format!("{}: {e}", path.display())))?;
        if metadata.len() > MAX_SETTINGS_FILE_SIZE {
            return Err(ConfigError::InvalidSetting(format!(
                "{} is {} bytes, larger than the {} byte limit",
                path.display(),
                metadata.len(),
                MAX_SETTINGS_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::IoError(format!("{}: {e}", path.display())))?;
        let settings: Self = serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        settings.validate()?;

        info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Check value ranges
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidSetting(format!(
                "base_url must start with http:// or https://, got {}",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting(
                "timeouts must be at least 1 second".to_string(),
            ));
        }
        if self.requests_per_minute == 0 {
            return Err(ConfigError::InvalidSetting(
                "requests_per_minute must be positive".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidSetting(
                "batch_size must be positive".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidSetting(
                "concurrency must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Platform config directory for the toolkit
pub fn default_config_dir() -> ConfigResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("clickup-toolkit"))
        .ok_or(ConfigError::NoConfigDir)
}

/// Path of the alias table inside `dir`
pub fn aliases_path(dir: &Path) -> PathBuf {
    dir.join(ALIASES_FILE)
}

/// Resolve credentials through `lookup` (an environment accessor)
pub fn resolve_credentials<F>(lookup: F) -> ConfigResult<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(key) = get("CLICKUP_API_KEY") {
        return Ok(Credentials::api_token(key));
    }
    if let Some(token) = get("CLICKUP_TOKEN").or_else(|| get("CLICKUP_ACCESS_TOKEN")) {
        return Ok(Credentials::api_token(token));
    }
    match (get("CLICKUP_CLIENT_ID"), get("CLICKUP_CLIENT_SECRET")) {
        (Some(id), Some(secret)) => Ok(Credentials::client(id, secret)),
        _ => Err(ConfigError::MissingCredentials),
    }
}

/// Resolve credentials from the process environment
pub fn credentials_from_env() -> ConfigResult<Credentials> {
    resolve_credentials(|name| std::env::var(name).ok())
}
