//! Model configuration registry.
//!
//! Maps each [`DocumentType`] to the model that summarizes it and the token
//! economics of that model. The registry is built once and never mutated;
//! share it behind an `Arc`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::document::DocumentType;
use crate::error::ConfigError;

/// How a model family turns text into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerFamily {
    /// One token per whitespace-separated word.
    Words,
    /// Sub-word vocabularies (BPE / SentencePiece), estimated from characters.
    #[default]
    Subword,
    /// The model's own HuggingFace `tokenizer.json`, named by
    /// [`ModelConfig::tokenizer_file`].
    Pretrained,
}

/// Model settings for one document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model_id: String,
    pub max_input_tokens: u32,
    pub reserved_output_tokens: u32,
    #[serde(default)]
    pub tokenizer: TokenizerFamily,
    /// `tokenizer.json` for [`TokenizerFamily::Pretrained`]. Relative paths in
    /// a model table file resolve against the file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer_file: Option<PathBuf>,
    #[serde(default)]
    pub description: String,
}

impl ModelConfig {
    pub fn new(model_id: impl Into<String>, max_input_tokens: u32, reserved_output_tokens: u32) -> Self {
        Self {
            model_id: model_id.into(),
            max_input_tokens,
            reserved_output_tokens,
            tokenizer: TokenizerFamily::default(),
            tokenizer_file: None,
            description: String::new(),
        }
    }

    pub fn with_tokenizer(mut self, tokenizer: TokenizerFamily) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Count tokens with the model's own `tokenizer.json`.
    pub fn with_tokenizer_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.tokenizer = TokenizerFamily::Pretrained;
        self.tokenizer_file = Some(path.into());
        self
    }

    /// Tokens available for input content: `max_input_tokens - reserved_output_tokens`.
    pub fn token_budget(&self) -> u32 {
        self.max_input_tokens.saturating_sub(self.reserved_output_tokens)
    }

    fn validate(&self, document_type: DocumentType) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidModelConfig {
            document_type,
            reason,
        };
        if self.model_id.trim().is_empty() {
            return Err(invalid("model_id is empty".into()));
        }
        if self.max_input_tokens == 0 {
            return Err(invalid("max_input_tokens must be > 0".into()));
        }
        if self.reserved_output_tokens >= self.max_input_tokens {
            return Err(invalid(format!(
                "reserved_output_tokens ({}) leaves no input budget out of {}",
                self.reserved_output_tokens, self.max_input_tokens
            )));
        }
        match (self.tokenizer, &self.tokenizer_file) {
            (TokenizerFamily::Pretrained, None) => {
                Err(invalid("tokenizer = \"pretrained\" needs a tokenizer_file".into()))
            }
            (TokenizerFamily::Words | TokenizerFamily::Subword, Some(_)) => Err(invalid(
                "tokenizer_file is only read with tokenizer = \"pretrained\"".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// (model, max input, reserved output, description)
type BuiltinRow = (&'static str, u32, u32, &'static str);

/// Fallback for every type without its own entry.
const BUILTIN_GENERAL: BuiltinRow = (
    "facebook/bart-base",
    1024,
    150,
    "General purpose summarization using BART",
);

const BUILTIN_MODELS: &[(DocumentType, BuiltinRow)] = &[
    (
        DocumentType::LegalContract,
        (
            "Equall/Saul-7B-Instruct-v1",
            1024,
            200,
            "Legal contract summarization using Saul",
        ),
    ),
    (
        DocumentType::Email,
        (
            "google/flan-t5-base",
            512,
            100,
            "Email summarization using FLAN-T5",
        ),
    ),
    (
        DocumentType::FinancialReport,
        (
            "google/flan-t5-base",
            512,
            100,
            "Receipts, invoices and statements using FLAN-T5",
        ),
    ),
    (
        DocumentType::TechnicalManual,
        (
            "facebook/bart-base",
            1024,
            200,
            "Technical documentation using BART",
        ),
    ),
    (
        DocumentType::NewsArticle,
        (
            "google/flan-t5-base",
            512,
            100,
            "News articles using FLAN-T5",
        ),
    ),
    (
        DocumentType::MedicalRecord,
        (
            "facebook/bart-base",
            1024,
            150,
            "Medical records using BART",
        ),
    ),
];

#[derive(Debug, Deserialize)]
struct ModelTableFile {
    #[serde(default)]
    models: BTreeMap<String, ModelConfig>,
}

/// Immutable `DocumentType -> ModelConfig` mapping with a guaranteed
/// `general` entry.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    entries: HashMap<DocumentType, ModelConfig>,
    general: ModelConfig,
}

impl ModelRegistry {
    /// The embedded production table.
    pub fn builtin() -> Self {
        let entries = BUILTIN_MODELS
            .iter()
            .map(|(doc_type, row)| (*doc_type, builtin_config(row)))
            .collect();
        Self::from_entries(entries)
    }

    fn from_entries(mut entries: HashMap<DocumentType, ModelConfig>) -> Self {
        let general = entries
            .remove(&DocumentType::General)
            .unwrap_or_else(|| builtin_config(&BUILTIN_GENERAL));
        Self { entries, general }
    }

    /// Parse a TOML table of `[models.<document_type>]` entries. Types the
    /// table omits fall back to `general`; a missing `general` entry is taken
    /// from the built-in table.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let file: ModelTableFile = toml::from_str(s)?;
        let mut entries = HashMap::new();
        for (key, config) in file.models {
            let doc_type: DocumentType = key.parse()?;
            config.validate(doc_type)?;
            entries.insert(doc_type, config);
        }
        Ok(Self::from_entries(entries))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut registry = Self::from_toml_str(&content)?;
        if let Some(dir) = path.parent() {
            registry.resolve_tokenizer_files(dir);
        }
        info!(path = %path.display(), entries = registry.len(), "loaded model table");
        Ok(registry)
    }

    fn resolve_tokenizer_files(&mut self, dir: &Path) {
        for config in self.entries.values_mut().chain(std::iter::once(&mut self.general)) {
            if let Some(file) = config.tokenizer_file.as_mut() {
                if file.is_relative() {
                    *file = dir.join(&*file);
                }
            }
        }
    }

    /// Return a copy with `document_type` mapped to `config`.
    pub fn with_override(
        mut self,
        document_type: DocumentType,
        config: ModelConfig,
    ) -> Result<Self, ConfigError> {
        config.validate(document_type)?;
        if document_type == DocumentType::General {
            self.general = config;
        } else {
            self.entries.insert(document_type, config);
        }
        Ok(self)
    }

    /// Total lookup: types without an explicit entry get the `general` config.
    pub fn config_for(&self, document_type: DocumentType) -> &ModelConfig {
        self.entries.get(&document_type).unwrap_or(&self.general)
    }

    /// Whether `document_type` has its own entry (as opposed to inheriting `general`).
    pub fn has_explicit(&self, document_type: DocumentType) -> bool {
        document_type == DocumentType::General || self.entries.contains_key(&document_type)
    }

    /// Number of explicit entries, `general` included.
    pub fn len(&self) -> usize {
        self.entries.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_config(&(model, max, reserved, description): &BuiltinRow) -> ModelConfig {
    ModelConfig {
        description: description.to_string(),
        ..ModelConfig::new(model, max, reserved)
    }
}
