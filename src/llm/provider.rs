use crate::llm::types::{BackendConfig, BackendError, BackendKind, GenerationOptions};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Uniform contract every text-generation backend implements.
pub trait BackendAdapter: Send + Sync {
    /// Generate a reply for `prompt`.
    ///
    /// Implementations must return within `timeout` and must stop promptly
    /// once `cancel` fires, reporting [`BackendError::Timeout`] and
    /// [`BackendError::Cancelled`] respectively. Every provider-specific
    /// failure is translated into a [`BackendError`].
    fn generate(
        &self,
        prompt: String,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> BoxFuture<'_, Result<String, BackendError>>;

    /// Provider protocol identifier, used in logs.
    fn provider_name(&self) -> &'static str;
}

/// Identity of one configured backend. Immutable once built.
#[derive(Clone)]
pub struct BackendDescriptor {
    pub name: String,
    pub timeout: Duration,
    pub adapter: Arc<dyn BackendAdapter>,
}

impl BackendDescriptor {
    pub fn new(name: impl Into<String>, timeout: Duration, adapter: Arc<dyn BackendAdapter>) -> Self {
        Self {
            name: name.into(),
            timeout,
            adapter,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.adapter.provider_name()
    }
}

impl std::fmt::Debug for BackendDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendDescriptor")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("provider", &self.adapter.provider_name())
            .finish()
    }
}

/// `timeout` from now, saturating at a far-future instant instead of overflowing.
pub fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(FAR_FUTURE_SECS))
}

const FAR_FUTURE_SECS: u64 = 86_400 * 365 * 30;

/// Drive `call` to completion unless `timeout` elapses or `cancel` fires first.
pub async fn run_bounded<F>(
    timeout: Duration,
    cancel: &CancellationToken,
    call: F,
) -> Result<String, BackendError>
where
    F: Future<Output = Result<String, BackendError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BackendError::Cancelled),
        result = tokio::time::timeout(timeout, call) => {
            result.unwrap_or(Err(BackendError::Timeout(timeout)))
        }
    }
}

/// Builds adapters from configuration.
pub struct AdapterFactory {
    client: reqwest::Client,
    model_cooldown: Duration,
}

impl AdapterFactory {
    /// `model_cooldown` applies to adapters that rotate through several models.
    pub fn new(model_cooldown: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("prompt-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackendError::Misconfigured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            model_cooldown,
        })
    }

    pub fn with_client(client: reqwest::Client, model_cooldown: Duration) -> Self {
        Self {
            client,
            model_cooldown,
        }
    }

    pub fn create_adapter(
        &self,
        config: &BackendConfig,
    ) -> Result<Arc<dyn BackendAdapter>, BackendError> {
        let api_key = config.api_key();
        if config.kind.requires_api_key() && api_key.is_none() {
            return Err(BackendError::Misconfigured(format!(
                "{} backend '{}' needs an API key (set {})",
                config.kind,
                config.name,
                config.api_key_env.as_deref().unwrap_or("api_key_env")
            )));
        }

        let endpoint = config.endpoint().trim_end_matches('/').to_string();
        let options = GenerationOptions::from(config);
        let client = self.client.clone();
        let models = config.resolved_models();
        let primary_model = models
            .first()
            .cloned()
            .ok_or_else(|| BackendError::Misconfigured("no model configured".to_string()))?;

        let adapter: Arc<dyn BackendAdapter> = match config.kind {
            BackendKind::OpenAI => Arc::new(crate::llm::openai_provider::OpenAIProvider::new(
                client,
                endpoint,
                api_key,
                primary_model,
                options,
            )),
            BackendKind::Ollama => Arc::new(crate::llm::ollama_provider::OllamaProvider::new(
                client,
                endpoint,
                primary_model,
                options,
            )),
            BackendKind::HuggingFace => Arc::new(
                crate::llm::huggingface_provider::HuggingFaceProvider::new(
                    client,
                    endpoint,
                    api_key,
                    models,
                    options,
                    self.model_cooldown,
                ),
            ),
            BackendKind::Gemini => Arc::new(crate::llm::gemini_provider::GeminiProvider::new(
                client,
                endpoint,
                api_key.unwrap_or_default(),
                primary_model,
                options,
            )),
        };

        Ok(adapter)
    }

    pub fn create_descriptor(&self, config: &BackendConfig) -> Result<BackendDescriptor, BackendError> {
        let adapter = self.create_adapter(config)?;
        Ok(BackendDescriptor::new(
            config.name.clone(),
            config.per_call_timeout(),
            adapter,
        ))
    }
}
