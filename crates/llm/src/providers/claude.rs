use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::read_json;
use crate::provider::{LlmError, LlmProvider};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

pub struct ClaudeProvider {
    client: reqwest::Client,
    api_key: String,
    temperature: f32,
}

impl ClaudeProvider {
    pub fn new(api_key: String, temperature: f32) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            temperature,
        }
    }

    pub(crate) fn build_request_body(&self, model: &str, prompt: &str, max_output_tokens: u32) -> Value {
        json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": max_output_tokens,
        })
    }
}

/// Concatenate the text blocks of a Messages API response.
pub(crate) fn parse_response(resp: &Value) -> Result<String, LlmError> {
    let blocks = resp["content"]
        .as_array()
        .ok_or_else(|| LlmError::ParseError("missing content".into()))?;
    let text: String = blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect();
    if text.is_empty() && blocks.is_empty() {
        return Err(LlmError::ParseError("missing content[0].text".into()));
    }
    Ok(text)
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<String, LlmError> {
        let body = self.build_request_body(model, prompt, max_output_tokens);

        debug!(model, "Claude request to {}", MESSAGES_URL);

        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let resp = read_json(response).await?;
        parse_response(&resp)
    }

    fn provider_name(&self) -> &str {
        "claude"
    }
}
