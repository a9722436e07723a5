//! Configuration loading from TOML with environment variable resolution.
//!
//! `config.toml` is optional; every field has a default so the tool runs
//! with nothing but `HYPIXEL_API_KEY` set. The key itself is never stored
//! in the file, only the name of the variable that holds it.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::FlipperError;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const HYPIXEL_BASE_URL: &str = "https://api.hypixel.net";
pub const MOJANG_BASE_URL: &str = "https://api.mojang.com";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub poller: PollerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub bazaar_base_url: String,
    pub mojang_base_url: String,
    /// Single attempt per request; no retries.
    pub request_timeout_secs: u64,
    /// Name of the environment variable holding the Hypixel key.
    pub api_key_env: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bazaar_base_url: HYPIXEL_BASE_URL.to_string(),
            mojang_base_url: MOJANG_BASE_URL.to_string(),
            request_timeout_secs: 10,
            api_key_env: "HYPIXEL_API_KEY".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub snapshot_dir: PathBuf,
    pub hourly_dir: PathBuf,
    pub export_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from("snapshots"),
            hourly_dir: PathBuf::from("hourly"),
            export_dir: PathBuf::from("exports"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollerConfig {
    pub interval_secs: u64,
    /// Rows written to the human-readable export. The JSON export is never truncated.
    pub top_n: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            top_n: 25,
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load from `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        if config.poller.interval_secs == 0 {
            anyhow::bail!("poller.interval_secs must be greater than zero");
        }
        Ok(config)
    }

    /// Resolve the Hypixel API key from the configured environment variable.
    pub fn api_key(&self) -> std::result::Result<SecretString, FlipperError> {
        Self::resolve_env(&self.api.api_key_env).map(SecretString::new)
    }

    /// Resolve an environment variable name to a non-empty value.
    pub fn resolve_env(env_name: &str) -> std::result::Result<String, FlipperError> {
        match std::env::var(env_name) {
            Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
            _ => Err(FlipperError::Config(format!(
                "{env_name} is not set. Add it to your environment or a .env file."
            ))),
        }
    }
}
