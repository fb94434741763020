use crate::api_types::ChatMessage;
use async_trait::async_trait;
use std::time::Duration;

/// Sampling parameters for one completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 350,
            temperature: 0.75,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("model request timed out after {0:?}")]
    Timeout(Duration),
    #[error("model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model request failed: {0}")]
    Transport(String),
    #[error("unreadable model response: {0}")]
    Malformed(String),
    #[error("model returned an empty reply")]
    Empty,
}

impl BackendError {
    /// The error text shown to the user, capped at `max_chars` characters.
    pub fn user_facing(&self, max_chars: usize) -> String {
        self.to_string().chars().take(max_chars).collect()
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// One chat completion. The system prompt goes first, followed by the
    /// conversation window in chronological order.
    async fn complete(
        &self,
        system: &str,
        messages: Vec<ChatMessage>,
        params: CompletionParams,
    ) -> Result<String, BackendError>;

    fn model(&self) -> &str;
}

// Providers available in crate::providers
