use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("invalid chunk parameters: max_tokens={max_tokens}, overlap_tokens={overlap_tokens} (need max_tokens > 0 and overlap_tokens < max_tokens)")]
    InvalidParameters {
        max_tokens: usize,
        overlap_tokens: usize,
    },
    #[error("content is empty or whitespace-only")]
    EmptyContent,
}
