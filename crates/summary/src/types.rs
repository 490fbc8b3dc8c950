//! Request and response types for the summary service.

use chrono::{DateTime, Utc};
use docsum_core::DocumentType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::strategy::StrategyOutput;

/// One summarization request.
///
/// When both `document_type` and `classification_label` are absent the
/// request is summarized with the general strategy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_label: Option<String>,
}

impl SummaryRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_document_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = Some(document_type);
        self
    }

    pub fn with_classification_label(mut self, label: impl Into<String>) -> Self {
        self.classification_label = Some(label.into());
        self
    }
}

/// Result of a completed summarization request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub request_id: Uuid,
    pub summary: String,
    pub document_type_used: DocumentType,
    pub strategy_name: String,
    pub model_used: String,
    pub chunked: bool,
    pub chunk_count: usize,
    /// Input tokens of the content under the model's tokenizer.
    pub token_count: usize,
    pub reduce_passes: u32,
    pub warnings: Vec<String>,
    pub processing_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl SummaryResponse {
    pub(crate) fn from_output(
        request_id: Uuid,
        document_type_used: DocumentType,
        strategy_name: &str,
        output: StrategyOutput,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            request_id,
            summary: output.summary,
            document_type_used,
            strategy_name: strategy_name.to_string(),
            model_used: output.model_used,
            chunked: output.chunk_count > 1,
            chunk_count: output.chunk_count,
            token_count: output.token_count,
            reduce_passes: output.reduce_passes,
            warnings: output.warnings,
            processing_time_ms,
            created_at: Utc::now(),
        }
    }
}

/// Lifecycle of one request, reported as the `phase` field of its log
/// events.
///
/// `Summarizing` covers the strategy run; inside it the engine moves
/// between `Chunking`, `Invoking` and `Reducing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPhase {
    Validating,
    Resolving,
    Summarizing,
    Chunking,
    Invoking,
    Reducing,
    Completed,
    Failed,
}

impl RequestPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestPhase::Validating => "validating",
            RequestPhase::Resolving => "resolving",
            RequestPhase::Summarizing => "summarizing",
            RequestPhase::Chunking => "chunking",
            RequestPhase::Invoking => "invoking",
            RequestPhase::Reducing => "reducing",
            RequestPhase::Completed => "completed",
            RequestPhase::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
