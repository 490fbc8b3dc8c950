use std::path::PathBuf;

use thiserror::Error;

use crate::document::DocumentType;

#[derive(Error, Debug)]
#[error("unknown document type: '{0}'")]
pub struct ParseDocumentTypeError(pub String);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model table: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("model table has unknown document type: {0}")]
    UnknownDocumentType(#[from] ParseDocumentTypeError),

    #[error("failed to load tokenizer {path}: {reason}")]
    Tokenizer { path: PathBuf, reason: String },

    #[error("invalid model config for {document_type}: {reason}")]
    InvalidModelConfig {
        document_type: DocumentType,
        reason: String,
    },
}
