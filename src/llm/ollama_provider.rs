use crate::llm::provider::{BackendAdapter, run_bounded};
use crate::llm::types::{BackendError, GenerationOptions};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Backend for a locally running Ollama server.
pub struct OllamaProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    options: GenerationOptions,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaProvider {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        model: String,
        options: GenerationOptions,
    ) -> Self {
        Self {
            client,
            endpoint,
            model,
            options,
        }
    }

    async fn call(&self, prompt: &str, timeout: Duration) -> Result<String, BackendError> {
        let options = if self.options.temperature.is_some() || self.options.max_tokens.is_some() {
            Some(GenerateOptions {
                temperature: self.options.temperature,
                num_predict: self.options.max_tokens,
            })
        } else {
            None
        };

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options,
        };

        let url = format!("{}/api/generate", self.endpoint);
        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&request)
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
        extract_generate_text(&body)
    }
}

pub(crate) fn extract_generate_text(body: &str) -> Result<String, BackendError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Malformed(e.to_string()))?;

    if parsed.response.trim().is_empty() {
        Err(BackendError::EmptyResponse)
    } else {
        Ok(parsed.response)
    }
}

impl BackendAdapter for OllamaProvider {
    fn generate(
        &self,
        prompt: String,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> BoxFuture<'_, Result<String, BackendError>> {
        Box::pin(async move { run_bounded(timeout, &cancel, self.call(&prompt, timeout)).await })
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }
}
