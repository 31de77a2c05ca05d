use crate::llm::provider::{BackendAdapter, run_bounded};
use crate::llm::types::{BackendError, GenerationOptions};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// OpenAI-compatible chat completions backend.
///
/// Works with any server exposing `POST {endpoint}/chat/completions`
/// (OpenAI, Perplexity, vLLM, LM Studio).
pub struct OpenAIProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    options: GenerationOptions,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl OpenAIProvider {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        api_key: Option<String>,
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
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        };

        let url = format!("{}/chat/completions", self.endpoint);
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
        extract_completion_text(&body)
    }
}

/// Pull the first choice's message content out of a chat completions body.
pub(crate) fn extract_completion_text(body: &str) -> Result<String, BackendError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Malformed(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(BackendError::EmptyResponse)
}

impl BackendAdapter for OpenAIProvider {
    fn generate(
        &self,
        prompt: String,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> BoxFuture<'_, Result<String, BackendError>> {
        Box::pin(async move { run_bounded(timeout, &cancel, self.call(&prompt, timeout)).await })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
