//! OpenAI-compatible `chat/completions` client. OpenRouter speaks the same
//! protocol, so both providers share this implementation.

use crate::api_types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::llm::{BackendError, CompletionParams, LlmClient};
use anyhow::{Context, Result};
use reqwest::Client;
use std::env;
use std::time::Duration;

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .context("Failed to build HTTP client")?,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    /// OpenRouter client keyed from `OPENROUTER_API_KEY`.
    pub fn openrouter(base_url: Option<&str>, model: &str, timeout: Duration) -> Result<Self> {
        let api_key = env::var("OPENROUTER_API_KEY").context("OPENROUTER_API_KEY not set")?;
        Self::new(base_url.unwrap_or(OPENROUTER_BASE_URL), &api_key, model, timeout)
    }

    /// OpenAI client keyed from `OPENAI_API_KEY`; `OPENAI_BASE_URL` overrides the endpoint.
    pub fn openai(base_url: Option<&str>, model: &str, timeout: Duration) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?;
        let base_url = base_url
            .map(str::to_string)
            .or_else(|| env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string());
        Self::new(&base_url, &api_key, model, timeout)
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(
        &self,
        system: &str,
        messages: Vec<ChatMessage>,
        params: CompletionParams,
    ) -> Result<String, BackendError> {
        let mut all = Vec::with_capacity(messages.len() + 1);
        all.push(ChatMessage::system(system));
        all.extend(messages);

        let payload = ChatCompletionRequest {
            model: &self.model,
            messages: all,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let started = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                "Chat completion failed with {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            );
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        tracing::debug!(
            "Chat completion from {} in {}ms (finish: {:?})",
            self.model,
            started.elapsed().as_millis(),
            parsed.choices.first().and_then(|c| c.finish_reason.as_deref())
        );

        parsed
            .first_text()
            .map(str::to_string)
            .ok_or(BackendError::Empty)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
