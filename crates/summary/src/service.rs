//! The document summary service: validates requests, resolves a strategy,
//! runs it and translates its errors.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use docsum_core::{Config, ConfigError, DocumentType, ModelRegistry};
use docsum_llm::LlmProvider;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::error::SummaryError;
use crate::factory::SummaryStrategyFactory;
use crate::strategy::SummaryEngine;
use crate::types::{RequestPhase, SummaryRequest, SummaryResponse};

/// Entry point for summarization. Holds no per-request state; share it
/// behind an `Arc` and call it concurrently.
pub struct DocumentSummaryService {
    factory: SummaryStrategyFactory,
}

impl DocumentSummaryService {
    pub fn new(factory: SummaryStrategyFactory) -> Self {
        Self { factory }
    }

    /// Build the full service from configuration: model table (built-in or
    /// from `summary.models_path`), engine limits and chunker tuning.
    pub fn from_config(config: &Config, backend: Arc<dyn LlmProvider>) -> Result<Self, ConfigError> {
        let registry = match &config.summary.models_path {
            Some(path) => ModelRegistry::from_file(path)?,
            None => ModelRegistry::builtin(),
        };
        Self::with_registry(config, &registry, backend)
    }

    /// Like [`Self::from_config`] with an explicit model table.
    pub fn with_registry(
        config: &Config,
        registry: &ModelRegistry,
        backend: Arc<dyn LlmProvider>,
    ) -> Result<Self, ConfigError> {
        let engine = Arc::new(SummaryEngine::from_config(backend, &config.summary));
        let factory = SummaryStrategyFactory::builder(registry, engine)
            .lookback_ratio(config.summary.lookback_ratio)
            .register_all()
            .build()?;
        Ok(Self::new(factory))
    }

    pub fn factory(&self) -> &SummaryStrategyFactory {
        &self.factory
    }

    /// Summarize `content`, using the strategy for `document_type` when given.
    pub async fn summarize_document(
        &self,
        content: &str,
        document_type: Option<DocumentType>,
    ) -> Result<SummaryResponse, SummaryError> {
        self.run(content, document_type, None).await
    }

    /// Summarize `content`, inferring the strategy from a classifier label.
    pub async fn summarize_with_classification(
        &self,
        content: &str,
        classification_label: &str,
    ) -> Result<SummaryResponse, SummaryError> {
        self.run(content, None, Some(classification_label)).await
    }

    pub async fn summarize(&self, request: &SummaryRequest) -> Result<SummaryResponse, SummaryError> {
        self.run(
            &request.content,
            request.document_type,
            request.classification_label.as_deref(),
        )
        .await
    }

    /// Document types with a registered strategy.
    pub fn available_document_types(&self) -> Vec<DocumentType> {
        self.factory.document_types()
    }

    pub fn available_strategies(&self) -> BTreeMap<DocumentType, String> {
        self.factory.available_strategies()
    }

    async fn run(
        &self,
        content: &str,
        document_type: Option<DocumentType>,
        classification_label: Option<&str>,
    ) -> Result<SummaryResponse, SummaryError> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();

        phase(request_id, RequestPhase::Validating);
        if content.trim().is_empty() {
            error!(%request_id, phase = %RequestPhase::Failed, "rejected empty content");
            return Err(SummaryError::EmptyContent);
        }

        phase(request_id, RequestPhase::Resolving);
        let strategy = self.factory.resolve(document_type, classification_label);
        debug!(
            %request_id,
            requested = ?document_type,
            label = ?classification_label,
            strategy = strategy.name(),
            model = %strategy.model_config().model_id,
            "strategy resolved"
        );

        phase(request_id, RequestPhase::Summarizing);
        let span = info_span!("summary_request", %request_id, strategy = strategy.name());
        let output = match strategy.summarize(content).instrument(span).await {
            Ok(output) => output,
            Err(e) => {
                let err = SummaryError::from(e);
                error!(
                    %request_id,
                    phase = %RequestPhase::Failed,
                    kind = ?err.kind(),
                    error = %err.detailed_message(),
                    "summarization failed"
                );
                return Err(err);
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let response = SummaryResponse::from_output(
            request_id,
            strategy.document_type(),
            strategy.name(),
            output,
            elapsed_ms,
        );
        info!(
            %request_id,
            phase = %RequestPhase::Completed,
            strategy = %response.strategy_name,
            chunked = response.chunked,
            chunks = response.chunk_count,
            reduce_passes = response.reduce_passes,
            warnings = response.warnings.len(),
            elapsed_ms,
            "summary completed"
        );
        Ok(response)
    }
}

fn phase(request_id: Uuid, phase: RequestPhase) {
    debug!(%request_id, %phase, "request phase");
}
