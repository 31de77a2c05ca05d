//! Process-start configuration for the relay.
//!
//! Loaded from TOML (see [`crate::cli::ConfigDiscovery`] for where the file
//! is looked up). All durations are whole seconds.

use crate::fallback::FallbackConfig;
use crate::llm::{BackendConfig, BackendError, BackendKind};
use crate::orchestrator::OrchestratorSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound for every timeout setting (one day).
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize configuration to TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Backend '{name}' could not be created: {source}")]
    Backend {
        name: String,
        #[source]
        source: BackendError,
    },
    #[error("Invalid label pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub overall_race_timeout_secs: u64,
    pub context_window_size: usize,
    pub breaker_cooldown_secs: u64,
    pub bot_name: String,
    pub user_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    pub strip_labels: Vec<String>,
    pub cancel_losers: bool,
    pub backends: Vec<BackendConfig>,
    pub fallback: FallbackConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        let settings = OrchestratorSettings::default();

        Self {
            overall_race_timeout_secs: settings.overall_timeout.as_secs(),
            context_window_size: 3,
            breaker_cooldown_secs: 60,
            bot_name: settings.bot_name,
            user_label: settings.user_label,
            persona: None,
            strip_labels: settings.strip_labels,
            cancel_losers: settings.cancel_losers,
            backends: vec![
                BackendConfig::new("gemini", BackendKind::Gemini)
                    .with_api_key_env("GOOGLE_API_KEY"),
                BackendConfig::new("huggingface", BackendKind::HuggingFace)
                    .with_api_key_env("HUGGINGFACE_API_KEY"),
                BackendConfig::new("perplexity", BackendKind::OpenAI)
                    .with_endpoint("https://api.perplexity.ai")
                    .with_model("llama-3-sonar-small-32k-online")
                    .with_api_key_env("PERPLEXITY_API_KEY"),
                BackendConfig::new("ollama", BackendKind::Ollama).with_timeout_secs(15),
            ],
            fallback: FallbackConfig::default(),
        }
    }
}

impl RelayConfig {
    pub fn overall_race_timeout(&self) -> Duration {
        Duration::from_secs(self.overall_race_timeout_secs)
    }

    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.breaker_cooldown_secs)
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            overall_timeout: self.overall_race_timeout(),
            bot_name: self.bot_name.clone(),
            user_label: self.user_label.clone(),
            persona: self.persona.clone(),
            strip_labels: self.strip_labels.clone(),
            cancel_losers: self.cancel_losers,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.overall_race_timeout_secs == 0
            || self.overall_race_timeout_secs > MAX_TIMEOUT_SECS
        {
            return Err(ConfigError::Invalid(format!(
                "overall_race_timeout_secs must be between 1 and {}",
                MAX_TIMEOUT_SECS
            )));
        }
        if self.context_window_size == 0 {
            return Err(ConfigError::Invalid(
                "context_window_size must be at least 1".to_string(),
            ));
        }
        if self.bot_name.trim().is_empty() {
            return Err(ConfigError::Invalid("bot_name must not be empty".to_string()));
        }

        let mut seen = HashSet::new();
        for backend in &self.backends {
            if backend.name.trim().is_empty() {
                return Err(ConfigError::Invalid("backend name must not be empty".to_string()));
            }
            if !seen.insert(backend.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate backend name '{}'",
                    backend.name
                )));
            }
            if backend.per_call_timeout_secs == 0
                || backend.per_call_timeout_secs > MAX_TIMEOUT_SECS
            {
                return Err(ConfigError::Invalid(format!(
                    "backend '{}' needs a per_call_timeout_secs between 1 and {}",
                    backend.name, MAX_TIMEOUT_SECS
                )));
            }
            url::Url::parse(backend.endpoint()).map_err(|e| {
                ConfigError::Invalid(format!(
                    "backend '{}' has an invalid endpoint '{}': {}",
                    backend.name,
                    backend.endpoint(),
                    e
                ))
            })?;
        }

        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RelayConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
