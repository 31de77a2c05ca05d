use crate::llm::provider::{BackendAdapter, run_bounded};
use crate::llm::types::{BackendError, GenerationOptions};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Google Gemini `generateContent` backend.
pub struct GeminiProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    options: GenerationOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiProvider {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        api_key: String,
        model: String,
        options: GenerationOptions,
    ) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            model,
            options,
        }
    }

    async fn call(&self, prompt: &str, timeout: Duration) -> Result<String, BackendError> {
        let generation_config =
            if self.options.max_tokens.is_some() || self.options.temperature.is_some() {
                Some(GenerationConfig {
                    max_output_tokens: self.options.max_tokens,
                    temperature: self.options.temperature,
                })
            } else {
                None
            };

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config,
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        );
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
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
        extract_candidate_text(&body)
    }
}

/// Concatenate the text parts of the first candidate.
pub(crate) fn extract_candidate_text(body: &str) -> Result<String, BackendError> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Malformed(e.to_string()))?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        Err(BackendError::EmptyResponse)
    } else {
        Ok(text)
    }
}

impl BackendAdapter for GeminiProvider {
    fn generate(
        &self,
        prompt: String,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> BoxFuture<'_, Result<String, BackendError>> {
        Box::pin(async move { run_bounded(timeout, &cancel, self.call(&prompt, timeout)).await })
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}
