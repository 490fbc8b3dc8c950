//! Token-bounded chunking engine.
//!
//! Splits extracted document text into contiguous, optionally overlapping
//! chunks that fit a model's input budget. Cuts prefer paragraph breaks,
//! then sentence ends, and fall back to a hard cut at the last word (or
//! character) that fits. Token counting is pluggable per model family.

mod error;
mod helpers;
mod service;
mod tokenizer;
mod types;

pub use error::ChunkError;
pub use service::{reconstruct, ChunkingService, Chunks};
pub use tokenizer::{
    counter_for, HeuristicTokenCounter, PretrainedTokenCounter, TokenCounter, WhitespaceTokenCounter,
};
pub use types::{Chunk, ChunkMetadata};
