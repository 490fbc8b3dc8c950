//! The chunking service: token-bounded, boundary-aware splitting.

use std::sync::Arc;

use docsum_core::TokenizerFamily;
use tracing::debug;

use super::error::ChunkError;
use super::helpers::{is_paragraph_break, is_sentence_end, split_paragraphs, split_sentences, word_starts};
use super::tokenizer::{counter_for, TokenCounter};
use super::types::{Chunk, ChunkMetadata};

/// Default share of the token budget a chunk may give up to end on a break.
const DEFAULT_LOOKBACK_RATIO: f32 = 0.25;

/// Splits text into chunks that fit a token budget.
///
/// Cheap to clone; the token counter is shared.
#[derive(Clone)]
pub struct ChunkingService {
    counter: Arc<dyn TokenCounter>,
    lookback_ratio: f32,
}

impl std::fmt::Debug for ChunkingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkingService")
            .field("counter", &self.counter.name())
            .field("lookback_ratio", &self.lookback_ratio)
            .finish()
    }
}

impl ChunkingService {
    pub fn new(counter: Arc<dyn TokenCounter>) -> Self {
        Self {
            counter,
            lookback_ratio: DEFAULT_LOOKBACK_RATIO,
        }
    }

    /// Service counting tokens the way `family` does.
    pub fn for_family(family: TokenizerFamily) -> Self {
        Self::new(counter_for(family))
    }

    /// Share (0.0–1.0) of `max_tokens` a chunk may give up, measured back
    /// from the hard cut, to end on a paragraph or sentence break. 0 disables
    /// the search.
    pub fn with_lookback_ratio(mut self, ratio: f32) -> Self {
        self.lookback_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        self.counter.count_tokens(text)
    }

    /// Split `content` into chunks of at most `max_tokens` tokens, each
    /// repeating up to `overlap_tokens` tokens from the end of its
    /// predecessor. The returned iterator is lazy and `Clone`; cloning it
    /// before consumption restarts the sequence.
    pub fn split<'a>(
        &'a self,
        content: &'a str,
        max_tokens: usize,
        overlap_tokens: usize,
    ) -> Result<Chunks<'a>, ChunkError> {
        if max_tokens == 0 || overlap_tokens >= max_tokens {
            return Err(ChunkError::InvalidParameters {
                max_tokens,
                overlap_tokens,
            });
        }
        if content.trim().is_empty() {
            return Err(ChunkError::EmptyContent);
        }
        debug!(
            bytes = content.len(),
            max_tokens,
            overlap_tokens,
            counter = self.counter.name(),
            "splitting content"
        );
        Ok(Chunks {
            content,
            counter: self.counter.as_ref(),
            cuts: word_starts(content).into(),
            max_tokens,
            overlap_tokens,
            lookback_ratio: self.lookback_ratio,
            next_start: 0,
            prev_end: 0,
            index: 0,
            done: false,
        })
    }

    /// Group sentences, `max_sentences` per chunk.
    pub fn chunk_by_sentences(&self, content: &str, max_sentences: usize) -> Vec<String> {
        let sentences = split_sentences(content);
        sentences
            .chunks(max_sentences.max(1))
            .map(|group| group.join(" "))
            .collect()
    }

    /// Group paragraphs, `max_paragraphs` per chunk.
    pub fn chunk_by_paragraphs(&self, content: &str, max_paragraphs: usize) -> Vec<String> {
        let paragraphs = split_paragraphs(content);
        paragraphs
            .chunks(max_paragraphs.max(1))
            .map(|group| group.join("\n\n"))
            .collect()
    }

    pub fn metadata(&self, text: &str) -> ChunkMetadata {
        ChunkMetadata {
            character_count: text.chars().count(),
            word_count: text.split_whitespace().count(),
            sentence_count: split_sentences(text).len(),
            paragraph_count: split_paragraphs(text).len(),
            token_count: self.counter.count_tokens(text),
        }
    }
}

/// Rebuild the source text from a complete, ordered chunk sequence.
pub fn reconstruct(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    for chunk in chunks {
        out.push_str(chunk.fresh_text());
    }
    out
}

// ── Lazy chunk sequence ─────────────────────────────────────────────────────

/// Lazy sequence of [`Chunk`]s produced by [`ChunkingService::split`].
#[derive(Clone)]
pub struct Chunks<'a> {
    content: &'a str,
    counter: &'a dyn TokenCounter,
    /// Word starts plus `content.len()`, ascending.
    cuts: Arc<[usize]>,
    max_tokens: usize,
    overlap_tokens: usize,
    lookback_ratio: f32,
    next_start: usize,
    prev_end: usize,
    index: usize,
    done: bool,
}

impl<'a> Chunks<'a> {
    fn tokens(&self, start: usize, end: usize) -> usize {
        self.counter.count_tokens(&self.content[start..end])
    }

    fn fits(&self, start: usize, end: usize) -> bool {
        self.tokens(start, end) <= self.max_tokens
    }

    /// Index of the first cut strictly greater than `pos`.
    fn first_cut_after(&self, pos: usize) -> usize {
        self.cuts.partition_point(|&c| c <= pos)
    }

    /// Largest end offset past `min_end` such that `[start, end)` fits.
    /// Word starts are tried first, then character boundaries inside the
    /// first word past `min_end`.
    fn hard_cut(&self, start: usize, min_end: usize) -> Option<usize> {
        let lo = self.first_cut_after(min_end);
        let candidates = &self.cuts[lo..];
        let n = candidates.partition_point(|&c| self.fits(start, c));
        if n > 0 {
            return Some(candidates[n - 1]);
        }

        // The next word alone is too big: cut inside it.
        let word_end = *candidates.first()?;
        let ends: Vec<usize> = self.content[min_end..word_end]
            .char_indices()
            .map(|(i, c)| min_end + i + c.len_utf8())
            .collect();
        let n = ends.partition_point(|&e| self.fits(start, e));
        (n > 0).then(|| ends[n - 1])
    }

    /// Move a hard cut back to a paragraph break, else a sentence end. The
    /// chunk keeps all but `lookback_ratio * max_tokens` of the hard cut's
    /// tokens, so with an additive counter every non-final chunk advances by
    /// at least `max_tokens - lookback - overlap` tokens.
    fn prefer_boundary(&self, start: usize, min_end: usize, hard: usize) -> usize {
        let give_up = (self.max_tokens as f32 * self.lookback_ratio) as usize;
        if give_up == 0 {
            return hard;
        }
        let keep = self.tokens(start, hard).saturating_sub(give_up);

        let lo = self.first_cut_after(min_end.max(start));
        let hi = self.cuts.partition_point(|&c| c <= hard);
        if lo >= hi {
            return hard;
        }
        let candidates = &self.cuts[lo..hi];
        let window = &candidates[candidates.partition_point(|&c| self.tokens(start, c) < keep)..];

        if let Some(&c) = window.iter().rev().find(|&&c| is_paragraph_break(self.content, c)) {
            return c;
        }
        if let Some(&c) = window.iter().rev().find(|&&c| is_sentence_end(self.content, c)) {
            return c;
        }
        hard
    }

    /// Earliest word start inside `(start, end)` whose suffix up to `end`
    /// fits the overlap budget; `end` when none does.
    fn overlap_start(&self, start: usize, end: usize) -> usize {
        if self.overlap_tokens == 0 {
            return end;
        }
        let lo = self.first_cut_after(start);
        let hi = self.cuts.partition_point(|&c| c < end);
        if lo >= hi {
            return end;
        }
        let window = &self.cuts[lo..hi];
        let first = window.partition_point(|&c| self.tokens(c, end) > self.overlap_tokens);
        window.get(first).copied().unwrap_or(end)
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.done {
            return None;
        }
        let len = self.content.len();
        let min_end = self.prev_end;
        let mut start = self.next_start;

        let end = if self.fits(start, len) {
            len
        } else {
            let hard = match self.hard_cut(start, min_end) {
                Some(hard) => Some(hard),
                // The overlap left no room to advance: drop it.
                None if start < min_end => {
                    start = min_end;
                    self.hard_cut(start, min_end)
                }
                None => None,
            };
            match hard {
                Some(hard) => self.prefer_boundary(start, min_end, hard),
                None => {
                    // A single character exceeds the budget. Emit it anyway;
                    // the oversized token count is visible to the caller.
                    let step = self.content[min_end..]
                        .chars()
                        .next()
                        .map_or(0, char::len_utf8);
                    min_end + step
                }
            }
        };

        let text = &self.content[start..end];
        let chunk = Chunk {
            index: self.index,
            text: text.to_string(),
            start,
            end,
            overlap: self.prev_end.saturating_sub(start),
            token_count: self.counter.count_tokens(text),
        };

        self.index += 1;
        self.prev_end = end;
        if end >= len {
            self.done = true;
        } else {
            self.next_start = self.overlap_start(start, end);
        }
        Some(chunk)
    }
}

impl std::iter::FusedIterator for Chunks<'_> {}
