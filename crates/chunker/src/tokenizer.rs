//! Pluggable token counting.

use std::path::Path;
use std::sync::Arc;

use docsum_core::{ConfigError, TokenizerFamily};
use tokenizers::Tokenizer;
use tracing::{info, warn};

/// Counts tokens the way a model family does.
///
/// Implementations must be monotone: appending text never lowers the count.
/// The chunker relies on this to binary-search cut points.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;

    /// Short identifier for logs.
    fn name(&self) -> &'static str;
}

/// One token per whitespace-separated word.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenCounter;

impl TokenCounter for WhitespaceTokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    fn name(&self) -> &'static str {
        "whitespace"
    }
}

/// Sub-word estimate: ~4 characters per token, ~2 per token for CJK.
///
/// Each character weighs a quarter token (CJK half a token) and the sum is
/// rounded up, which keeps the count monotone.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

impl TokenCounter for HeuristicTokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        // Fast path for pure ASCII.
        if text.is_ascii() {
            return text.len().div_ceil(4);
        }
        let quarters: usize = text
            .chars()
            .map(|c| if is_cjk_char(c) { 2 } else { 1 })
            .sum();
        quarters.div_ceil(4)
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

#[inline]
fn is_cjk_char(c: char) -> bool {
    let code = c as u32;
    (0x4E00..=0x9FFF).contains(&code) || // CJK Unified Ideographs
    (0x3040..=0x309F).contains(&code) || // Hiragana
    (0x30A0..=0x30FF).contains(&code) || // Katakana
    (0xAC00..=0xD7AF).contains(&code) // Hangul
}

/// Exact counts from a model's HuggingFace `tokenizer.json`, special tokens
/// included.
pub struct PretrainedTokenCounter {
    tokenizer: Tokenizer,
}

impl PretrainedTokenCounter {
    /// Load `tokenizer.json`. Truncation and padding from the file are
    /// switched off so counts reflect the whole text.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let load_error = |e: tokenizers::Error| ConfigError::Tokenizer {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        let mut tokenizer = Tokenizer::from_file(path).map_err(load_error)?;
        tokenizer.with_truncation(None).map_err(load_error)?;
        tokenizer.with_padding(None);
        info!(path = %path.display(), "loaded tokenizer");
        Ok(Self { tokenizer })
    }
}

impl TokenCounter for PretrainedTokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        match self.tokenizer.encode(text, true) {
            Ok(encoding) => encoding.len(),
            Err(e) => {
                warn!(error = %e, "tokenizer failed, estimating token count");
                HeuristicTokenCounter.count_tokens(text)
            }
        }
    }

    fn name(&self) -> &'static str {
        "pretrained"
    }
}

/// Counter matching a model's tokenizer family. `Pretrained` needs its
/// `tokenizer.json` (see [`PretrainedTokenCounter`]); without one it falls
/// back to the sub-word estimate.
pub fn counter_for(family: TokenizerFamily) -> Arc<dyn TokenCounter> {
    match family {
        TokenizerFamily::Words => Arc::new(WhitespaceTokenCounter),
        TokenizerFamily::Subword | TokenizerFamily::Pretrained => Arc::new(HeuristicTokenCounter),
    }
}
