//! Chunk output types.

use serde::Serialize;

// ── Chunk output ────────────────────────────────────────────────────────────

/// A contiguous slice of the source content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// 0-based position in the sequence; order is document order.
    pub index: usize,
    /// The chunk text, `content[start..end]`.
    pub text: String,
    /// Byte offset of the first byte in the source.
    pub start: usize,
    /// Byte offset one past the last byte in the source.
    pub end: usize,
    /// Leading bytes shared with the previous chunk.
    pub overlap: usize,
    /// Token count under the service's counter.
    pub token_count: usize,
}

impl Chunk {
    /// The part of this chunk not already covered by the previous one.
    pub fn fresh_text(&self) -> &str {
        &self.text[self.overlap..]
    }
}

// ── Metadata ────────────────────────────────────────────────────────────────

/// Descriptive counts for a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkMetadata {
    pub character_count: usize,
    pub word_count: usize,
    pub sentence_count: usize,
    pub paragraph_count: usize,
    pub token_count: usize,
}
