//! Configuration file support for parla.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/parla/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that carries the provider credential
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Value shipped in sample `.env` files; never a real key
const PLACEHOLDER_API_KEY: &str = "your_key_here";

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Remote question provider configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default = "default_target_language")]
    pub target_language: String,

    #[serde(default = "default_learner_language")]
    pub learner_language: String,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            endpoint: default_endpoint(),
            level: default_level(),
            target_language: default_target_language(),
            learner_language: default_learner_language(),
            max_attempts: default_max_attempts(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Quiz session parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_length")]
    pub default_length: usize,

    #[serde(default = "default_max_failures")]
    pub max_failures: u32,

    #[serde(default = "default_empty_batch_backoff_secs")]
    pub empty_batch_backoff_secs: u64,

    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_length: default_session_length(),
            max_failures: default_max_failures(),
            empty_batch_backoff_secs: default_empty_batch_backoff_secs(),
            error_backoff_secs: default_error_backoff_secs(),
        }
    }
}

impl SessionConfig {
    /// Configured session length, never below one question
    pub fn session_length(&self) -> usize {
        self.default_length.max(1)
    }

    pub fn empty_batch_backoff(&self) -> Duration {
        Duration::from_secs(self.empty_batch_backoff_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("parla")
}

fn default_model() -> String {
    "gemini-flash-latest".into()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}

fn default_level() -> String {
    "A1".into()
}

fn default_target_language() -> String {
    "Italian".into()
}

fn default_learner_language() -> String {
    "German".into()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_session_length() -> usize {
    15
}

fn default_max_failures() -> u32 {
    3
}

fn default_empty_batch_backoff_secs() -> u64 {
    30
}

fn default_error_backoff_secs() -> u64 {
    60
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        Self::load_or_default(&Self::default_config_path())
    }

    /// Load configuration from `path`, falling back to defaults when it is absent
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("parla").join("config.toml")
    }

    /// Resolve the provider credential from the environment or the config file
    ///
    /// The environment variable wins over `provider.api_key`. A missing, blank
    /// or placeholder value is a configuration error.
    pub fn api_key(&self) -> Result<String> {
        let from_env = std::env::var(API_KEY_ENV).ok();
        resolve_api_key(from_env, self.provider.api_key.clone())
    }
}

fn resolve_api_key(from_env: Option<String>, from_file: Option<String>) -> Result<String> {
    let key = from_env
        .filter(|k| !k.trim().is_empty())
        .or(from_file)
        .map(|k| k.trim().to_string())
        .unwrap_or_default();

    if key.is_empty() || key == PLACEHOLDER_API_KEY {
        return Err(Error::Config(format!(
            "{} is missing or invalid",
            API_KEY_ENV
        )));
    }
    Ok(key)
}
