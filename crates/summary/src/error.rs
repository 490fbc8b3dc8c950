//! Error types for strategies and the summary service.

use docsum_chunker::ChunkError;
use docsum_core::DocumentType;
use docsum_llm::LlmError;
use serde::Serialize;

/// Failures raised at the strategy boundary, after backend errors have been
/// classified and local retries are spent.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("chunking rejected the token budget")]
    InvalidChunkParameters(#[source] ChunkError),

    #[error("model '{model}' could not be loaded after {attempts} attempt(s)")]
    ModelLoad {
        model: String,
        attempts: u32,
        #[source]
        source: LlmError,
    },

    #[error("model '{model}' produced no usable summary: {reason}")]
    SummaryGeneration { model: String, reason: String },

    #[error("input of {tokens} tokens exceeds the {budget}-token budget of model '{model}'")]
    TokenLimitExceeded {
        model: String,
        tokens: usize,
        budget: usize,
    },

    #[error("document type '{0}' is not supported by this strategy")]
    DocumentTypeNotSupported(DocumentType),

    #[error("combined summaries still exceed the budget after {depth} reduce pass(es)")]
    ReduceDepthExceeded { depth: u32 },
}

/// Stable tag for a [`SummaryError`], for callers that branch on the kind
/// rather than the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    EmptyContent,
    InvalidChunkParameters,
    ModelLoad,
    SummaryGeneration,
    TokenLimitExceeded,
    DocumentTypeNotSupported,
}

impl ErrorKind {
    /// Whether a caller may reasonably resubmit the same request later.
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::ModelLoad)
    }
}

/// Errors surfaced by [`crate::DocumentSummaryService`]. Each variant other
/// than `EmptyContent` keeps the strategy-level cause as its source.
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("document content is empty")]
    EmptyContent,

    #[error("summarization misconfigured")]
    InvalidChunkParameters(#[source] StrategyError),

    #[error("model unavailable")]
    ModelLoad(#[source] StrategyError),

    #[error("summary generation failed")]
    SummaryGeneration(#[source] StrategyError),

    #[error("token limit exceeded")]
    TokenLimitExceeded(#[source] StrategyError),

    #[error("document type not supported")]
    DocumentTypeNotSupported(#[source] StrategyError),
}

impl SummaryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SummaryError::EmptyContent => ErrorKind::EmptyContent,
            SummaryError::InvalidChunkParameters(_) => ErrorKind::InvalidChunkParameters,
            SummaryError::ModelLoad(_) => ErrorKind::ModelLoad,
            SummaryError::SummaryGeneration(_) => ErrorKind::SummaryGeneration,
            SummaryError::TokenLimitExceeded(_) => ErrorKind::TokenLimitExceeded,
            SummaryError::DocumentTypeNotSupported(_) => ErrorKind::DocumentTypeNotSupported,
        }
    }

    /// The strategy-level cause, when there is one.
    pub fn cause(&self) -> Option<&StrategyError> {
        match self {
            SummaryError::EmptyContent => None,
            SummaryError::InvalidChunkParameters(e)
            | SummaryError::ModelLoad(e)
            | SummaryError::SummaryGeneration(e)
            | SummaryError::TokenLimitExceeded(e)
            | SummaryError::DocumentTypeNotSupported(e) => Some(e),
        }
    }

    /// Full message including the chain of causes.
    pub fn detailed_message(&self) -> String {
        let mut msg = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            msg.push_str(": ");
            msg.push_str(&cause.to_string());
            source = cause.source();
        }
        msg
    }
}

impl From<StrategyError> for SummaryError {
    fn from(e: StrategyError) -> Self {
        match e {
            StrategyError::InvalidChunkParameters(_) => SummaryError::InvalidChunkParameters(e),
            StrategyError::ModelLoad { .. } => SummaryError::ModelLoad(e),
            StrategyError::SummaryGeneration { .. } | StrategyError::ReduceDepthExceeded { .. } => {
                SummaryError::SummaryGeneration(e)
            }
            StrategyError::TokenLimitExceeded { .. } => SummaryError::TokenLimitExceeded(e),
            StrategyError::DocumentTypeNotSupported(_) => SummaryError::DocumentTypeNotSupported(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_errors_map_to_service_kinds() {
        let load = StrategyError::ModelLoad {
            model: "m".into(),
            attempts: 3,
            source: LlmError::ModelUnavailable("down".into()),
        };
        assert_eq!(SummaryError::from(load).kind(), ErrorKind::ModelLoad);

        let depth = StrategyError::ReduceDepthExceeded { depth: 3 };
        assert_eq!(SummaryError::from(depth).kind(), ErrorKind::SummaryGeneration);

        let chunk = StrategyError::InvalidChunkParameters(ChunkError::InvalidParameters {
            max_tokens: 0,
            overlap_tokens: 0,
        });
        assert_eq!(SummaryError::from(chunk).kind(), ErrorKind::InvalidChunkParameters);
    }

    #[test]
    fn detailed_message_walks_the_cause_chain() {
        let err = SummaryError::from(StrategyError::ModelLoad {
            model: "facebook/bart-base".into(),
            attempts: 3,
            source: LlmError::ModelUnavailable("loading".into()),
        });
        let msg = err.detailed_message();
        assert!(msg.starts_with("model unavailable: "));
        assert!(msg.contains("after 3 attempt(s)"));
        assert!(msg.ends_with("model unavailable: loading"));
        assert!(err.cause().is_some());
        assert!(SummaryError::EmptyContent.cause().is_none());
    }

    #[test]
    fn only_model_load_is_transient() {
        assert!(ErrorKind::ModelLoad.is_transient());
        assert!(!ErrorKind::TokenLimitExceeded.is_transient());
        assert!(!ErrorKind::EmptyContent.is_transient());
    }
}
