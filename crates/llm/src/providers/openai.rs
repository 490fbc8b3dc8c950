use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::read_json;
use crate::provider::{LlmError, LlmProvider};

/// OpenAI chat completions, or any server speaking the same API.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    temperature: f32,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: String, temperature: f32) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
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

pub(crate) fn parse_response(resp: &Value) -> Result<String, LlmError> {
    resp["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| LlmError::ParseError("missing choices[0].message.content".into()))
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = self.build_request_body(model, prompt, max_output_tokens);

        debug!(model, "OpenAI request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let resp = read_json(response).await?;
        parse_response(&resp)
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_is_single_user_message() {
        let provider = OpenAiProvider::new("sk".into(), "https://api.openai.com".into(), 0.3);
        let body = provider.build_request_body("gpt-4o-mini", "Summarize: x", 150);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], 150);
    }

    #[test]
    fn parses_first_choice() {
        let resp = json!({"choices": [{"message": {"role": "assistant", "content": "Done."}}]});
        assert_eq!(parse_response(&resp).unwrap(), "Done.");
        assert!(parse_response(&json!({"choices": []})).is_err());
    }
}
