use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The single error type every backend adapter reports.
///
/// Provider-specific failures (HTTP status, payload shape, transport errors)
/// are flattened into one of these variants at the adapter boundary. Nothing
/// past the orchestrator ever sees them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Malformed payload: {0}")]
    Malformed(String),
    #[error("Empty response")]
    EmptyResponse,
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    #[error("Call cancelled")]
    Cancelled,
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Backend misconfigured: {0}")]
    Misconfigured(String),
}

impl BackendError {
    /// Short stable label used in logs and status snapshots.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Network(_) => "network",
            BackendError::Status { .. } => "status",
            BackendError::Authentication(_) => "authentication",
            BackendError::Malformed(_) => "malformed",
            BackendError::EmptyResponse => "empty",
            BackendError::Timeout(_) => "timeout",
            BackendError::Cancelled => "cancelled",
            BackendError::Unavailable(_) => "unavailable",
            BackendError::Misconfigured(_) => "misconfigured",
        }
    }

    /// Translate a transport error, keeping timeouts distinct. The request
    /// URL is dropped so credentials carried in it never reach logs.
    pub fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        let error = error.without_url();
        if error.is_timeout() {
            BackendError::Timeout(timeout)
        } else if error.is_decode() {
            BackendError::Malformed(error.to_string())
        } else {
            BackendError::Network(error.to_string())
        }
    }

    /// Translate a non-success HTTP status into an error.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => BackendError::Authentication(body),
            code => BackendError::Status { status: code, body },
        }
    }
}

/// Supported provider protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// OpenAI-compatible chat completions (OpenAI, Perplexity, vLLM, LM Studio, ...)
    OpenAI,
    /// Local Ollama server
    Ollama,
    /// HuggingFace hosted inference API
    HuggingFace,
    /// Google Gemini generateContent API
    Gemini,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OpenAI => "openai",
            BackendKind::Ollama => "ollama",
            BackendKind::HuggingFace => "huggingface",
            BackendKind::Gemini => "gemini",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            BackendKind::OpenAI => "https://api.openai.com/v1",
            BackendKind::Ollama => "http://localhost:11434",
            BackendKind::HuggingFace => "https://api-inference.huggingface.co",
            BackendKind::Gemini => "https://generativelanguage.googleapis.com",
        }
    }

    pub fn default_models(&self) -> Vec<String> {
        let models: &[&str] = match self {
            BackendKind::OpenAI => &["gpt-4o-mini"],
            BackendKind::Ollama => &["llama3"],
            BackendKind::HuggingFace => &[
                "HuggingFaceH4/zephyr-7b-beta",
                "mistralai/Mistral-7B-Instruct-v0.2",
                "facebook/opt-1.3b",
                "microsoft/DialoGPT-medium",
            ],
            BackendKind::Gemini => &["gemini-pro"],
        };
        models.iter().map(|m| m.to_string()).collect()
    }

    /// Whether the provider refuses to work without an API key.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, BackendKind::Gemini)
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for one backend, as it appears in the TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Unique key used by the circuit breaker registry and in logs.
    pub name: String,
    pub kind: BackendKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Model for single-model providers. HuggingFace uses `models` instead when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,
    /// Name of the environment variable holding the bearer token / API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default = "default_per_call_timeout_secs")]
    pub per_call_timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_per_call_timeout_secs() -> u64 {
    10
}

fn default_enabled() -> bool {
    true
}

impl BackendConfig {
    pub fn new(name: impl Into<String>, kind: BackendKind) -> Self {
        Self {
            name: name.into(),
            kind,
            endpoint: None,
            model: None,
            models: Vec::new(),
            api_key_env: None,
            per_call_timeout_secs: default_per_call_timeout_secs(),
            max_tokens: None,
            temperature: None,
            enabled: true,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = Some(var.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.per_call_timeout_secs = secs;
        self
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.kind.default_endpoint())
    }

    /// Ordered list of models to try. Never empty.
    pub fn resolved_models(&self) -> Vec<String> {
        if !self.models.is_empty() {
            return self.models.clone();
        }
        match &self.model {
            Some(model) => vec![model.clone()],
            None => self.kind.default_models(),
        }
    }

    pub fn per_call_timeout(&self) -> Duration {
        Duration::from_secs(self.per_call_timeout_secs)
    }

    /// Resolve the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Generation knobs shared by all HTTP adapters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl From<&BackendConfig> for GenerationOptions {
    fn from(config: &BackendConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}
