pub mod claude;
pub mod ollama;
pub mod openai;

use std::sync::Arc;

use docsum_core::config::{LlmConfig, OllamaConfig};

use crate::provider::{LlmError, LlmProvider};

/// Create the appropriate LLM provider based on config.
pub fn create_provider(
    llm_config: &LlmConfig,
    ollama_config: &OllamaConfig,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match llm_config.provider.as_str() {
        "openai" => {
            let api_key = llm_config
                .openai_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("OPENAI_API_KEY not set".into()))?;
            let base_url = llm_config
                .openai_base_url
                .as_deref()
                .unwrap_or("https://api.openai.com");
            Ok(Arc::new(openai::OpenAiProvider::new(
                api_key.clone(),
                base_url.to_string(),
                llm_config.temperature,
            )))
        }
        "anthropic" | "claude" => {
            let api_key = llm_config
                .anthropic_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("ANTHROPIC_API_KEY not set".into()))?;
            Ok(Arc::new(claude::ClaudeProvider::new(
                api_key.clone(),
                llm_config.temperature,
            )))
        }
        "ollama" => Ok(Arc::new(ollama::OllamaProvider::new(
            ollama_config.url.clone(),
            llm_config.temperature,
        ))),
        other => Err(LlmError::NotConfigured(format!(
            "unknown LLM provider: '{}'",
            other
        ))),
    }
}

/// Read an HTTP response, mapping non-200 statuses to [`LlmError::ApiError`].
pub(crate) async fn read_json(response: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = response.status().as_u16();
    if status != 200 {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::ApiError { status, body });
    }
    Ok(response.json().await?)
}
