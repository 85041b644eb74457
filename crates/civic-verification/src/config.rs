//! Engine configuration
//!
//! Defaults reproduce the production policy. A YAML file named by
//! `CIVIC_CONFIG` can override any field, and a handful of environment
//! variables override the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use civic_reputation::AwardTable;

use crate::rules::AutoVerifyPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for the AI channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// Base URL of the classification service; `None` disables AI verification
    pub service_url: Option<String>,

    /// Directory evidence paths are resolved against
    pub upload_root: PathBuf,

    /// Bound on each provider call
    pub timeout_ms: u64,

    /// Total attempts per report, including the first
    pub max_attempts: u32,

    pub retry_backoff_ms: u64,
}

impl AiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            service_url: None,
            upload_root: PathBuf::from("uploads"),
            timeout_ms: 10_000,
            max_attempts: 2,
            retry_backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub auto_verify: AutoVerifyPolicy,
    pub awards: AwardTable,
    pub ai: AiSettings,
    /// Maximum retained audit entries
    pub audit_capacity: Option<usize>,
}

impl EngineConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Defaults, then `CIVIC_CONFIG`, then individual variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("CIVIC_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(url) = std::env::var("CIVIC_AI_URL") {
            config.ai.service_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Ok(root) = std::env::var("CIVIC_UPLOAD_ROOT") {
            config.ai.upload_root = PathBuf::from(root);
        }
        if let Ok(ms) = std::env::var("CIVIC_AI_TIMEOUT_MS") {
            config.ai.timeout_ms = ms
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("CIVIC_AI_TIMEOUT_MS: '{}'", ms)))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auto_verify.validate().map_err(ConfigError::Invalid)?;
        if self.ai.timeout_ms == 0 {
            return Err(ConfigError::Invalid("ai.timeout_ms must be positive".to_string()));
        }
        if self.ai.max_attempts == 0 {
            return Err(ConfigError::Invalid("ai.max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}
