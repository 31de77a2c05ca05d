use crate::breaker::BreakerRegistry;
use crate::llm::provider::{BackendAdapter, deadline_after, run_bounded};
use crate::llm::types::{BackendError, GenerationOptions};
use futures::future::BoxFuture;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// HuggingFace inference API backend.
///
/// Tries its models in order. Each model carries its own cooldown, so a model
/// that just failed is skipped by the next calls while its siblings are still
/// tried. The whole rotation shares the single per-call timeout.
pub struct HuggingFaceProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    models: Vec<String>,
    options: GenerationOptions,
    model_breakers: BreakerRegistry,
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
    temperature: f32,
    top_p: f32,
    do_sample: bool,
}

impl HuggingFaceProvider {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        api_key: Option<String>,
        models: Vec<String>,
        options: GenerationOptions,
        model_cooldown: Duration,
    ) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            models,
            options,
            model_breakers: BreakerRegistry::new(model_cooldown),
        }
    }

    pub fn model_breakers(&self) -> &BreakerRegistry {
        &self.model_breakers
    }

    async fn call(&self, prompt: &str, timeout: Duration) -> Result<String, BackendError> {
        let deadline = deadline_after(timeout);
        let mut last_error = None;

        for model in &self.models {
            if !self.model_breakers.is_eligible(model) {
                debug!(model = %model, "HuggingFace model cooling down, skipping");
                continue;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(BackendError::Timeout(timeout));
            }

            match self.call_model(model, prompt, remaining).await {
                Ok(text) => {
                    self.model_breakers.record_success(model);
                    return Ok(text);
                }
                Err(error) => {
                    warn!(model = %model, error = %error, "HuggingFace model failed");
                    self.model_breakers.record_failure(model, &error.to_string());
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BackendError::Unavailable("all HuggingFace models are cooling down".to_string())
        }))
    }

    async fn call_model(
        &self,
        model: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, BackendError> {
        let request = InferenceRequest {
            inputs: prompt,
            parameters: InferenceParameters {
                max_new_tokens: self.options.max_tokens.unwrap_or(250),
                temperature: self.options.temperature.unwrap_or(0.7),
                top_p: 0.9,
                do_sample: true,
            },
        };

        let url = format!("{}/models/{}", self.endpoint, model);
        let mut builder = self.client.post(&url).timeout(timeout).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status, body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| BackendError::from_reqwest(e, timeout))?;
        extract_generated_text(&body, prompt)
    }
}

/// Read `generated_text` from an inference response, dropping an echoed prompt.
pub(crate) fn extract_generated_text(body: &str, prompt: &str) -> Result<String, BackendError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| BackendError::Malformed(e.to_string()))?;

    if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
        return Err(BackendError::Unavailable(message.to_string()));
    }

    let generated = value
        .as_array()
        .and_then(|items| items.first())
        .and_then(|item| item.get("generated_text"))
        .and_then(|text| text.as_str())
        .ok_or_else(|| BackendError::Malformed("missing generated_text".to_string()))?;

    let text = generated
        .strip_prefix(prompt)
        .unwrap_or(generated)
        .trim()
        .to_string();

    if text.is_empty() {
        Err(BackendError::EmptyResponse)
    } else {
        Ok(text)
    }
}

impl BackendAdapter for HuggingFaceProvider {
    fn generate(
        &self,
        prompt: String,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> BoxFuture<'_, Result<String, BackendError>> {
        Box::pin(async move { run_bounded(timeout, &cancel, self.call(&prompt, timeout)).await })
    }

    fn provider_name(&self) -> &'static str {
        "huggingface"
    }
}
