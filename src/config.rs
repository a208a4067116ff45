use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use crate::models::PermissionState;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub with_twitter: bool,
    /// Transport timeout; unset leaves reqwest's default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollerConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Drop responses that complete after a newer one was applied.
    #[serde(default)]
    pub discard_stale: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    #[serde(default = "default_permission")]
    pub permission: PermissionState,
    #[serde(default)]
    pub notify_on_first_load: bool,
    #[serde(default = "default_start_hidden")]
    pub start_hidden: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

fn default_base_url() -> String { "http://localhost:8000".to_string() }
fn default_interval_ms() -> u64 { 60_000 }
fn default_permission() -> PermissionState { PermissionState::Granted }
fn default_start_hidden() -> bool { true }
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 3000 }

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            with_twitter: false,
            timeout_secs: None,
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            discard_stale: false,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            permission: default_permission(),
            notify_on_first_load: false,
            start_hidden: default_start_hidden(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poller.interval_ms == 0 {
            return Err(ConfigError::Invalid("poller.interval_ms must be > 0".to_string()));
        }
        reqwest::Url::parse(&self.backend.base_url)
            .map_err(|e| ConfigError::Invalid(format!("backend.base_url: {}", e)))?;
        Ok(())
    }
}
