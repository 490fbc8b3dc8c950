//! Summarization strategies, one per document type.

mod engine;
mod kind;

use std::sync::Arc;

use async_trait::async_trait;
use docsum_chunker::ChunkingService;
use docsum_core::{DocumentType, ModelConfig};
use serde::Serialize;

pub use engine::{RetryPolicy, SummaryEngine};
pub use kind::StrategyKind;

use crate::error::StrategyError;

/// What a strategy produced for one piece of content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyOutput {
    pub summary: String,
    /// Chunks the content was split into; 1 when it fit a single call.
    pub chunk_count: usize,
    pub reduce_passes: u32,
    /// Content size under the model's tokenizer.
    pub token_count: usize,
    pub model_used: String,
    pub warnings: Vec<String>,
}

/// A document-type specific summarizer.
#[async_trait]
pub trait SummaryStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn document_type(&self) -> DocumentType;

    fn model_config(&self) -> &ModelConfig;

    fn can_handle(&self, document_type: DocumentType) -> bool {
        document_type == self.document_type()
    }

    async fn summarize(&self, content: &str) -> Result<StrategyOutput, StrategyError>;

    /// Summarize content declared as `document_type`, refusing types this
    /// strategy does not handle.
    async fn summarize_as(
        &self,
        document_type: DocumentType,
        content: &str,
    ) -> Result<StrategyOutput, StrategyError> {
        if !self.can_handle(document_type) {
            return Err(StrategyError::DocumentTypeNotSupported(document_type));
        }
        self.summarize(content).await
    }
}

/// The strategy implementation shared by every [`StrategyKind`]: the kind
/// supplies prompts and post-processing, the engine does the work.
pub struct DocumentStrategy {
    kind: StrategyKind,
    model: ModelConfig,
    chunker: ChunkingService,
    engine: Arc<SummaryEngine>,
}

impl DocumentStrategy {
    pub fn new(
        kind: StrategyKind,
        model: ModelConfig,
        chunker: ChunkingService,
        engine: Arc<SummaryEngine>,
    ) -> Self {
        Self {
            kind,
            model,
            chunker,
            engine,
        }
    }
}

impl std::fmt::Debug for DocumentStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStrategy")
            .field("kind", &self.kind)
            .field("model", &self.model.model_id)
            .field("chunker", &self.chunker)
            .finish()
    }
}

#[async_trait]
impl SummaryStrategy for DocumentStrategy {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn document_type(&self) -> DocumentType {
        self.kind.document_type()
    }

    fn model_config(&self) -> &ModelConfig {
        &self.model
    }

    async fn summarize(&self, content: &str) -> Result<StrategyOutput, StrategyError> {
        self.engine
            .run(self.kind, &self.model, &self.chunker, content)
            .await
    }
}
