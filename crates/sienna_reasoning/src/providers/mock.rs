//! Mock LLM provider: deterministic responses for running without API keys.

use crate::api_types::ChatMessage;
use crate::llm::{BackendError, CompletionParams, LlmClient};

#[derive(Debug, Clone)]
pub struct MockProvider {
    model: String,
}

impl MockProvider {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for MockProvider {
    async fn complete(
        &self,
        _system: &str,
        messages: Vec<ChatMessage>,
        _params: CompletionParams,
    ) -> Result<String, BackendError> {
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        Ok(format!(
            "(Mock {} Response) I received: {}",
            self.model,
            last.chars().take(80).collect::<String>()
        ))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
