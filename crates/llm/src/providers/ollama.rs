use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::read_json;
use crate::provider::{LlmError, LlmProvider};

/// Local models served by Ollama. Ollama pulls and loads models itself; a
/// model that is not present yet answers 404.
pub struct OllamaProvider {
    client: reqwest::Client,
    url: String,
    temperature: f32,
}

impl OllamaProvider {
    pub fn new(url: String, temperature: f32) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            temperature,
        }
    }

    pub(crate) fn build_request_body(&self, model: &str, prompt: &str, max_output_tokens: u32) -> Value {
        json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": max_output_tokens,
            },
        })
    }
}

pub(crate) fn parse_response(resp: &Value) -> Result<String, LlmError> {
    if let Some(err) = resp["error"].as_str() {
        return Err(LlmError::ModelUnavailable(err.to_string()));
    }
    resp["response"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| LlmError::ParseError("missing response".into()))
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.url.trim_end_matches('/'));
        let body = self.build_request_body(model, prompt, max_output_tokens);

        debug!(model, "Ollama request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let resp = read_json(response).await?;
        parse_response(&resp)
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }
}
