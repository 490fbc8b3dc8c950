//! Strategy registration and resolution.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use docsum_chunker::{ChunkingService, PretrainedTokenCounter, TokenCounter};
use docsum_core::{ConfigError, DocumentType, ModelRegistry};
use tracing::debug;

use crate::error::StrategyError;
use crate::strategy::{DocumentStrategy, StrategyKind, SummaryEngine, SummaryStrategy};

/// Classifier labels and the document types they map to. Keys are
/// normalized (lowercase, single spaces).
const LABEL_TABLE: &[(&str, DocumentType)] = &[
    ("contract", DocumentType::LegalContract),
    ("nda", DocumentType::LegalContract),
    ("court filing", DocumentType::LegalContract),
    ("court opinion", DocumentType::LegalContract),
    ("settlement agreement", DocumentType::LegalContract),
    ("power of attorney", DocumentType::LegalContract),
    ("legal memorandum", DocumentType::LegalContract),
    ("agreement", DocumentType::LegalContract),
    ("legal", DocumentType::LegalContract),
    ("email", DocumentType::Email),
    ("letter", DocumentType::Email),
    ("invoice", DocumentType::FinancialReport),
    ("purchase order", DocumentType::FinancialReport),
    ("receipt", DocumentType::FinancialReport),
    ("balance sheet", DocumentType::FinancialReport),
    ("income statement", DocumentType::FinancialReport),
    ("expense report", DocumentType::FinancialReport),
    ("tax return", DocumentType::FinancialReport),
    ("budget forecast", DocumentType::FinancialReport),
    ("financial", DocumentType::FinancialReport),
    ("product specification", DocumentType::TechnicalManual),
    ("engineering drawing", DocumentType::TechnicalManual),
    ("source code", DocumentType::TechnicalManual),
    ("test report", DocumentType::TechnicalManual),
    ("patent application", DocumentType::TechnicalManual),
    ("manual", DocumentType::TechnicalManual),
    ("technical", DocumentType::TechnicalManual),
    ("news article", DocumentType::NewsArticle),
    ("press release", DocumentType::NewsArticle),
    ("research report", DocumentType::NewsArticle),
    ("survey results", DocumentType::NewsArticle),
    ("article", DocumentType::NewsArticle),
    ("medical", DocumentType::MedicalRecord),
];

fn normalize_label(label: &str) -> String {
    label
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn table_lookup(key: &str) -> Option<DocumentType> {
    LABEL_TABLE
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, t)| *t)
}

/// Map a free-text classifier label to a document type. Total: labels
/// that match nothing map to `General`.
///
/// An exact table entry wins, then a document type identifier, then the
/// first word of the label that is itself a table entry.
pub fn classify_label(label: &str) -> DocumentType {
    let normalized = normalize_label(label);
    if let Some(t) = table_lookup(&normalized) {
        return t;
    }
    if let Ok(t) = normalized.parse::<DocumentType>() {
        return t;
    }
    normalized
        .split(' ')
        .find_map(table_lookup)
        .unwrap_or(DocumentType::General)
}

/// Owns one strategy per registered document type and picks the right one
/// for a request.
pub struct SummaryStrategyFactory {
    strategies: HashMap<DocumentType, Arc<dyn SummaryStrategy>>,
    general: Arc<dyn SummaryStrategy>,
}

impl SummaryStrategyFactory {
    /// Factory with a strategy for every document type. Fails when a
    /// model's `tokenizer.json` cannot be loaded.
    pub fn new(registry: &ModelRegistry, engine: Arc<SummaryEngine>) -> Result<Self, ConfigError> {
        Self::builder(registry, engine).register_all().build()
    }

    pub fn builder(registry: &ModelRegistry, engine: Arc<SummaryEngine>) -> FactoryBuilder<'_> {
        FactoryBuilder {
            registry,
            engine,
            lookback_ratio: None,
            pending: Vec::new(),
        }
    }

    /// Resolve the strategy for a request.
    ///
    /// A registered explicit type wins; otherwise the classification label
    /// is mapped through the label table; otherwise `general`. Never fails.
    pub fn resolve(
        &self,
        document_type: Option<DocumentType>,
        classification_label: Option<&str>,
    ) -> Arc<dyn SummaryStrategy> {
        if let Some(strategy) = document_type.and_then(|t| self.strategies.get(&t)) {
            debug!(document_type = %strategy.document_type(), "resolved explicit document type");
            return Arc::clone(strategy);
        }
        if let Some(label) = classification_label {
            let mapped = classify_label(label);
            if let Some(strategy) = self.strategies.get(&mapped) {
                debug!(label, document_type = %mapped, "resolved classification label");
                return Arc::clone(strategy);
            }
        }
        debug!(?document_type, ?classification_label, "falling back to general strategy");
        self.general()
    }

    /// Strict lookup, for callers that bypass resolution.
    pub fn get(&self, document_type: DocumentType) -> Result<Arc<dyn SummaryStrategy>, StrategyError> {
        self.strategies
            .get(&document_type)
            .cloned()
            .ok_or(StrategyError::DocumentTypeNotSupported(document_type))
    }

    pub fn general(&self) -> Arc<dyn SummaryStrategy> {
        Arc::clone(&self.general)
    }

    /// Registered document types in declaration order.
    pub fn document_types(&self) -> Vec<DocumentType> {
        DocumentType::ALL
            .into_iter()
            .filter(|t| self.strategies.contains_key(t))
            .collect()
    }

    /// Registered document type -> strategy name.
    pub fn available_strategies(&self) -> BTreeMap<DocumentType, String> {
        self.strategies
            .iter()
            .map(|(t, s)| (*t, s.name().to_string()))
            .collect()
    }
}

enum Pending {
    Builtin {
        document_type: DocumentType,
        lookback_ratio: Option<f32>,
    },
    Custom(Arc<dyn SummaryStrategy>),
}

/// Builder for [`SummaryStrategyFactory`]. Registrations apply in order; a
/// later one for the same document type replaces an earlier one.
pub struct FactoryBuilder<'a> {
    registry: &'a ModelRegistry,
    engine: Arc<SummaryEngine>,
    lookback_ratio: Option<f32>,
    pending: Vec<Pending>,
}

impl<'a> FactoryBuilder<'a> {
    /// Look-back ratio for the chunkers of strategies registered after this call.
    pub fn lookback_ratio(mut self, ratio: f32) -> Self {
        self.lookback_ratio = Some(ratio);
        self
    }

    /// Register the built-in strategy for `document_type`.
    pub fn register(mut self, document_type: DocumentType) -> Self {
        self.pending.push(Pending::Builtin {
            document_type,
            lookback_ratio: self.lookback_ratio,
        });
        self
    }

    pub fn register_all(self) -> Self {
        DocumentType::ALL
            .into_iter()
            .fold(self, |builder, t| builder.register(t))
    }

    /// Register a custom strategy under its own document type.
    pub fn register_strategy(mut self, strategy: Arc<dyn SummaryStrategy>) -> Self {
        self.pending.push(Pending::Custom(strategy));
        self
    }

    /// Finish the factory. `general` is registered if it was not already.
    /// Each `tokenizer.json` is loaded once and shared by the strategies
    /// whose models name it.
    pub fn build(self) -> Result<SummaryStrategyFactory, ConfigError> {
        let FactoryBuilder {
            registry,
            engine,
            lookback_ratio,
            pending,
        } = self;
        let mut tokenizers = HashMap::new();
        let mut strategies: HashMap<DocumentType, Arc<dyn SummaryStrategy>> = HashMap::new();

        for item in pending {
            let strategy = match item {
                Pending::Builtin {
                    document_type,
                    lookback_ratio,
                } => build_strategy(registry, &engine, document_type, lookback_ratio, &mut tokenizers)?,
                Pending::Custom(strategy) => strategy,
            };
            strategies.insert(strategy.document_type(), strategy);
        }

        let general = match strategies.get(&DocumentType::General) {
            Some(strategy) => Arc::clone(strategy),
            None => {
                let strategy = build_strategy(
                    registry,
                    &engine,
                    DocumentType::General,
                    lookback_ratio,
                    &mut tokenizers,
                )?;
                strategies.insert(DocumentType::General, Arc::clone(&strategy));
                strategy
            }
        };
        debug!(
            strategies = strategies.len(),
            tokenizers = tokenizers.len(),
            "strategy factory built"
        );
        Ok(SummaryStrategyFactory { strategies, general })
    }
}

fn build_strategy(
    registry: &ModelRegistry,
    engine: &Arc<SummaryEngine>,
    document_type: DocumentType,
    lookback_ratio: Option<f32>,
    tokenizers: &mut HashMap<PathBuf, Arc<dyn TokenCounter>>,
) -> Result<Arc<dyn SummaryStrategy>, ConfigError> {
    let model = registry.config_for(document_type).clone();
    let mut chunker = match &model.tokenizer_file {
        Some(path) => {
            let counter = match tokenizers.get(path) {
                Some(counter) => Arc::clone(counter),
                None => {
                    let counter: Arc<dyn TokenCounter> = Arc::new(PretrainedTokenCounter::from_file(path)?);
                    tokenizers.insert(path.clone(), Arc::clone(&counter));
                    counter
                }
            };
            ChunkingService::new(counter)
        }
        None => ChunkingService::for_family(model.tokenizer),
    };
    if let Some(ratio) = lookback_ratio {
        chunker = chunker.with_lookback_ratio(ratio);
    }
    Ok(Arc::new(DocumentStrategy::new(
        StrategyKind::for_document_type(document_type),
        model,
        chunker,
        Arc::clone(engine),
    )))
}
