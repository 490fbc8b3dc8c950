use async_trait::async_trait;

/// Inference backend — each model-serving mechanism implements this.
///
/// The backend owns model download, caching and placement; callers only
/// name the model they want.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run `prompt` through `model` and return the generated text.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<String, LlmError>;

    /// Provider name for logging/debugging (e.g., "claude", "openai", "ollama")
    fn provider_name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} — {body}")]
    ApiError { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    ParseError(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
}

/// Coarse failure class of an [`LlmError`], used by callers to decide
/// whether a call is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// The model could not be reached or loaded; transient.
    Unavailable,
    /// The prompt did not fit the model's context window.
    ContextOverflow,
    /// The model answered but the answer was unusable.
    BadOutput,
    /// Missing credentials or unknown provider; repeating will not help.
    Misconfigured,
    /// The request was rejected for another reason.
    Rejected,
}

impl LlmError {
    pub fn kind(&self) -> LlmErrorKind {
        match self {
            LlmError::HttpError(e) if e.is_decode() => LlmErrorKind::BadOutput,
            LlmError::HttpError(_) => LlmErrorKind::Unavailable,
            LlmError::ModelUnavailable(_) => LlmErrorKind::Unavailable,
            LlmError::ParseError(_) => LlmErrorKind::BadOutput,
            LlmError::NotConfigured(_) => LlmErrorKind::Misconfigured,
            LlmError::ApiError { status, body } => classify_status(*status, body),
        }
    }
}

fn classify_status(status: u16, body: &str) -> LlmErrorKind {
    let lower = body.to_lowercase();
    let mentions_context = ["context length", "context_length", "maximum context", "too many tokens", "too long"]
        .iter()
        .any(|needle| lower.contains(needle));
    match status {
        400 | 413 if mentions_context => LlmErrorKind::ContextOverflow,
        401 | 403 => LlmErrorKind::Misconfigured,
        404 | 408 | 429 => LlmErrorKind::Unavailable,
        500..=599 => LlmErrorKind::Unavailable,
        _ => LlmErrorKind::Rejected,
    }
}
