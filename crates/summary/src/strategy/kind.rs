//! Per-document-type behaviour: prompts, output economics, post-processing.

use docsum_core::{DocumentType, ModelConfig};

const CONTENT: &str = "{content}";
const SUMMARY_MARKER: &str = "Summary:";
const DOCUMENT_MARKER: &str = "Document:";
const MAX_CLAUSE_REFS: usize = 8;

/// The closed set of summarization strategies, one per [`DocumentType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    LegalContract,
    Email,
    FinancialReport,
    TechnicalManual,
    NewsArticle,
    MedicalRecord,
    General,
}

impl StrategyKind {
    pub fn for_document_type(document_type: DocumentType) -> Self {
        match document_type {
            DocumentType::LegalContract => StrategyKind::LegalContract,
            DocumentType::Email => StrategyKind::Email,
            DocumentType::FinancialReport => StrategyKind::FinancialReport,
            DocumentType::TechnicalManual => StrategyKind::TechnicalManual,
            DocumentType::NewsArticle => StrategyKind::NewsArticle,
            DocumentType::MedicalRecord => StrategyKind::MedicalRecord,
            DocumentType::General => StrategyKind::General,
        }
    }

    pub fn document_type(self) -> DocumentType {
        match self {
            StrategyKind::LegalContract => DocumentType::LegalContract,
            StrategyKind::Email => DocumentType::Email,
            StrategyKind::FinancialReport => DocumentType::FinancialReport,
            StrategyKind::TechnicalManual => DocumentType::TechnicalManual,
            StrategyKind::NewsArticle => DocumentType::NewsArticle,
            StrategyKind::MedicalRecord => DocumentType::MedicalRecord,
            StrategyKind::General => DocumentType::General,
        }
    }

    /// Strategy name reported in responses; the document type identifier.
    pub fn name(self) -> &'static str {
        self.document_type().as_str()
    }

    fn template(self) -> &'static str {
        match self {
            StrategyKind::LegalContract => {
                "Please summarize this legal document. Focus on:\n\
                 1. Parties involved\n\
                 2. Key terms and conditions\n\
                 3. Important dates and deadlines\n\
                 4. Obligations and responsibilities\n\
                 5. Any special clauses or exceptions\n\n\
                 Document:\n{content}\n\nSummary:"
            }
            StrategyKind::Email => {
                "Summarize this email. Focus on:\n\
                 1. Sender and recipient\n\
                 2. Main topic or subject\n\
                 3. Key points discussed\n\
                 4. Action items or decisions made\n\
                 5. Important dates or deadlines mentioned\n\n\
                 Email:\n{content}\n\nSummary:"
            }
            StrategyKind::FinancialReport => {
                "Summarize this financial document. Focus on:\n\
                 1. Reporting entity and period\n\
                 2. Key figures, totals and amounts\n\
                 3. Notable changes or trends\n\
                 4. Payment terms, due dates and obligations\n\n\
                 Report:\n{content}\n\nSummary:"
            }
            StrategyKind::TechnicalManual => {
                "Summarize this technical document. Focus on:\n\
                 1. The system or product described\n\
                 2. Main components and how they interact\n\
                 3. Procedures, requirements and constraints\n\
                 4. Warnings, limits and version information\n\n\
                 Document:\n{content}\n\nSummary:"
            }
            StrategyKind::NewsArticle => {
                "Summarize this article. Focus on:\n\
                 1. What happened\n\
                 2. Who is involved\n\
                 3. When and where it happened\n\
                 4. Why it matters\n\n\
                 Article:\n{content}\n\nSummary:"
            }
            StrategyKind::MedicalRecord => {
                "Summarize this medical record. Focus on:\n\
                 1. Patient presentation and history\n\
                 2. Diagnoses and findings\n\
                 3. Medications and treatments\n\
                 4. Follow-up instructions and dates\n\n\
                 Record:\n{content}\n\nSummary:"
            }
            StrategyKind::General => {
                "Summarize this document. Focus on:\n\
                 1. Main topic or subject\n\
                 2. Key points and important information\n\
                 3. Main conclusions or outcomes\n\
                 4. Any important dates, names, or numbers mentioned\n\n\
                 Document:\n{content}\n\nSummary:"
            }
        }
    }

    fn noun(self) -> &'static str {
        match self {
            StrategyKind::LegalContract => "legal document",
            StrategyKind::Email => "email",
            StrategyKind::FinancialReport => "financial document",
            StrategyKind::TechnicalManual => "technical document",
            StrategyKind::NewsArticle => "article",
            StrategyKind::MedicalRecord => "medical record",
            StrategyKind::General => "document",
        }
    }

    /// Prompt for summarizing one piece of source text.
    pub fn prompt(self, content: &str) -> String {
        self.template().replace(CONTENT, content)
    }

    /// Prompt for merging ordered partial summaries.
    pub fn reduce_prompt(self, partials: &str) -> String {
        format!(
            "The following are consecutive partial summaries of one {noun}, in document order. \
             Combine them into a single coherent summary that keeps that order.\n\n\
             Partial summaries:\n{partials}\n\nSummary:",
            noun = self.noun(),
        )
    }

    /// Share of the model's reserved output tokens a summary may use.
    pub fn output_ratio(self) -> f32 {
        match self {
            StrategyKind::Email => 0.5,
            StrategyKind::NewsArticle => 0.75,
            _ => 1.0,
        }
    }

    /// `max_output_tokens` for every call made with `config`.
    pub fn max_output_tokens(self, config: &ModelConfig) -> u32 {
        let tokens = (config.reserved_output_tokens as f32 * self.output_ratio()).round() as u32;
        tokens.max(1)
    }

    /// Strip prompt echoes from raw model output.
    pub fn clean(self, output: &str, source: &str) -> String {
        let mut text = output;
        if self == StrategyKind::LegalContract {
            text = strip_echoed_document(text, source);
        }
        if let Some(pos) = text.rfind(SUMMARY_MARKER) {
            text = &text[pos + SUMMARY_MARKER.len()..];
        }
        text.trim().to_string()
    }

    /// Final touches on the merged summary of `source`.
    pub fn finish(self, summary: String, source: &str) -> String {
        match self {
            StrategyKind::LegalContract => {
                let refs = clause_references(source);
                if refs.is_empty() {
                    summary
                } else {
                    format!("Key clauses: {}\n\n{}", refs.join(", "), summary)
                }
            }
            _ => summary,
        }
    }
}

/// Drop an echoed `Document:` block that repeats `source` verbatim.
fn strip_echoed_document<'a>(output: &'a str, source: &str) -> &'a str {
    let Some(pos) = output.find(DOCUMENT_MARKER) else {
        return output;
    };
    let rest = output[pos + DOCUMENT_MARKER.len()..].trim_start();
    rest.strip_prefix(source.trim()).unwrap_or(output)
}

/// Clause references (`Section 4.2`, `Clause 7`, `Article III`, `§ 12`) in
/// document order, deduplicated, at most [`MAX_CLAUSE_REFS`].
pub(crate) fn clause_references(text: &str) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    let mut words = text.split_whitespace().peekable();

    while let Some(word) = words.next() {
        let candidate = if let Some(number) = word.strip_prefix('§').filter(|n| !n.is_empty()) {
            clause_number(number).map(|n| format!("§ {n}"))
        } else if word == "§" {
            words.peek().and_then(|n| clause_number(n)).map(|n| format!("§ {n}"))
        } else {
            let label = match word.to_ascii_lowercase().as_str() {
                "section" => Some("Section"),
                "clause" => Some("Clause"),
                "article" => Some("Article"),
                _ => None,
            };
            label.and_then(|label| {
                words
                    .peek()
                    .and_then(|n| clause_number(n))
                    .map(|n| format!("{label} {n}"))
            })
        };

        if let Some(reference) = candidate {
            if !refs.contains(&reference) {
                refs.push(reference);
                if refs.len() == MAX_CLAUSE_REFS {
                    break;
                }
            }
        }
    }
    refs
}

/// `4`, `4.2`, `4.2(a)` or an upper-case roman numeral, without trailing
/// punctuation.
fn clause_number(word: &str) -> Option<&str> {
    let n = word.trim_end_matches([',', ';', ':', '.']);
    let numeric = n.starts_with(|c: char| c.is_ascii_digit())
        && n.chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '(' || c == ')' || c.is_ascii_lowercase());
    let roman = !n.is_empty() && n.len() <= 6 && n.chars().all(|c| "IVXLCDM".contains(c));
    (numeric || roman).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_round_trip_document_types() {
        for t in DocumentType::ALL {
            assert_eq!(StrategyKind::for_document_type(t).document_type(), t);
        }
        assert_eq!(StrategyKind::Email.name(), "email");
        assert_eq!(StrategyKind::LegalContract.name(), "legal_contract");
    }

    #[test]
    fn prompt_embeds_content() {
        let prompt = StrategyKind::Email.prompt("Hi Bob, the meeting moved to 3pm.");
        assert!(prompt.starts_with("Summarize this email."));
        assert!(prompt.contains("Email:\nHi Bob, the meeting moved to 3pm.\n\nSummary:"));
        assert!(StrategyKind::General.reduce_prompt("a\n\nb").contains("Partial summaries:\na\n\nb"));
    }

    #[test]
    fn email_compresses_harder() {
        let config = ModelConfig::new("google/flan-t5-base", 512, 100);
        assert_eq!(StrategyKind::Email.max_output_tokens(&config), 50);
        assert_eq!(StrategyKind::NewsArticle.max_output_tokens(&config), 75);
        assert_eq!(StrategyKind::General.max_output_tokens(&config), 100);
        let none_reserved = ModelConfig::new("m", 10, 0);
        assert_eq!(StrategyKind::Email.max_output_tokens(&none_reserved), 1);
    }

    #[test]
    fn clean_strips_echoed_prompt() {
        let source = "Alice met Bob.";
        let echoed = format!("{}\n Alice and Bob met.", StrategyKind::General.prompt(source));
        assert_eq!(StrategyKind::General.clean(&echoed, source), "Alice and Bob met.");
        assert_eq!(StrategyKind::Email.clean("  plain  ", source), "plain");
    }

    #[test]
    fn legal_clean_drops_echoed_document_without_marker() {
        let source = "This Agreement is made between A and B.";
        let output = format!("Document:\n{source}\nA and B enter an agreement.");
        assert_eq!(
            StrategyKind::LegalContract.clean(&output, source),
            "A and B enter an agreement."
        );
        // Unrelated text after the marker is left alone.
        assert_eq!(
            StrategyKind::LegalContract.clean("Document: something else", source),
            "Document: something else"
        );
    }

    #[test]
    fn finds_clause_references_in_order() {
        let text = "Under Section 4.2, the Buyer pays. See Clause 7; Article III applies. \
                    Per § 12 and §14. Section 4.2 again. This section is informal.";
        assert_eq!(
            clause_references(text),
            vec!["Section 4.2", "Clause 7", "Article III", "§ 12", "§ 14"]
        );
    }

    #[test]
    fn clause_references_are_capped() {
        let text: String = (1..=20).map(|i| format!("Section {i}. ")).collect();
        let refs = clause_references(&text);
        assert_eq!(refs.len(), 8);
        assert_eq!(refs[0], "Section 1");
        assert_eq!(refs[7], "Section 8");
    }

    #[test]
    fn legal_finish_prepends_key_clauses() {
        let out = StrategyKind::LegalContract.finish("Summary text.".into(), "Clause 9(b) governs.");
        assert_eq!(out, "Key clauses: Clause 9(b)\n\nSummary text.");
        let plain = StrategyKind::LegalContract.finish("Summary text.".into(), "No references.");
        assert_eq!(plain, "Summary text.");
        assert_eq!(StrategyKind::Email.finish("x".into(), "Section 1"), "x");
    }
}
