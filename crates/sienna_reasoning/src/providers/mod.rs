pub mod mock;
pub mod openai;

use crate::llm::LlmClient;
use anyhow::Result;
use sienna_core::config::LlmConfig;
use std::sync::Arc;

/// Build the backend named by `config.provider`.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let base_url = config.base_url.as_deref();
    let client: Arc<dyn LlmClient> = match config.provider.as_str() {
        "openrouter" => Arc::new(openai::OpenAiClient::openrouter(
            base_url,
            &config.model,
            config.timeout(),
        )?),
        "openai" => Arc::new(openai::OpenAiClient::openai(
            base_url,
            &config.model,
            config.timeout(),
        )?),
        "mock" => Arc::new(mock::MockProvider::new(&config.model)),
        other => anyhow::bail!("Unknown LLM provider: {}", other),
    };
    tracing::info!("Using {} provider with model {}", config.provider, config.model);
    Ok(client)
}
