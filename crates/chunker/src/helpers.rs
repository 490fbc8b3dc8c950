//! Text boundary utilities used by the chunking service.

/// Byte offsets where a word begins (excluding offset 0), followed by
/// `text.len()`. These are the candidate cut points for chunks.
pub(crate) fn word_starts(text: &str) -> Vec<usize> {
    let mut cuts = Vec::new();
    let mut prev_ws = false;
    for (i, c) in text.char_indices() {
        let ws = c.is_whitespace();
        if i > 0 && prev_ws && !ws {
            cuts.push(i);
        }
        prev_ws = ws;
    }
    cuts.push(text.len());
    cuts
}

/// True when the whitespace run ending at `pos` contains a blank line.
pub(crate) fn is_paragraph_break(text: &str, pos: usize) -> bool {
    let newlines = text[..pos]
        .chars()
        .rev()
        .take_while(|c| c.is_whitespace())
        .filter(|&c| c == '\n')
        .count();
    newlines >= 2
}

/// True when the text before the whitespace run ending at `pos` closes a
/// sentence (`.`, `!`, `?`, optionally followed by a closing quote or
/// bracket) and the word at `pos` does not start lowercase.
pub(crate) fn is_sentence_end(text: &str, pos: usize) -> bool {
    if text[pos..].chars().next().is_some_and(|c| c.is_lowercase()) {
        return false;
    }
    text[..pos]
        .chars()
        .rev()
        .skip_while(|c| c.is_whitespace())
        .find(|c| !matches!(c, '"' | '\'' | ')' | ']' | '\u{201D}' | '\u{2019}'))
        .is_some_and(|c| matches!(c, '.' | '!' | '?'))
}

/// Split `text` at sentence boundaries (`. `, `! `, `? ` followed by uppercase
/// or newline). Returns non-empty fragments.
pub(crate) fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();

    let mut i = 0;
    while i < bytes.len() {
        let is_terminal = bytes[i] == b'.' || bytes[i] == b'!' || bytes[i] == b'?';
        if is_terminal && i + 1 < bytes.len() && (bytes[i + 1] == b' ' || bytes[i + 1] == b'\n') {
            let after_space = if i + 2 < bytes.len() { bytes[i + 2] } else { b'\n' };
            if after_space.is_ascii_uppercase() || after_space == b'\n' || bytes[i + 1] == b'\n' {
                let end = i + 1; // include the terminal punctuation
                let s = text[start..end].trim();
                if !s.is_empty() {
                    sentences.push(s.to_string());
                }
                start = end + 1; // skip the separator
                i = start;
                continue;
            }
        }
        i += 1;
    }

    // Remainder
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Non-empty, trimmed paragraphs separated by blank lines.
pub(crate) fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}
