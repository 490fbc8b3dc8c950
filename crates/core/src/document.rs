use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseDocumentTypeError;

/// Category of a document. Drives strategy and model selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    LegalContract,
    Email,
    FinancialReport,
    TechnicalManual,
    NewsArticle,
    MedicalRecord,
    General,
}

impl DocumentType {
    /// Every variant, in declaration order.
    pub const ALL: [DocumentType; 7] = [
        DocumentType::LegalContract,
        DocumentType::Email,
        DocumentType::FinancialReport,
        DocumentType::TechnicalManual,
        DocumentType::NewsArticle,
        DocumentType::MedicalRecord,
        DocumentType::General,
    ];

    /// Stable identifier, e.g. `legal_contract`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::LegalContract => "legal_contract",
            DocumentType::Email => "email",
            DocumentType::FinancialReport => "financial_report",
            DocumentType::TechnicalManual => "technical_manual",
            DocumentType::NewsArticle => "news_article",
            DocumentType::MedicalRecord => "medical_record",
            DocumentType::General => "general",
        }
    }

    /// Parse an identifier, degrading anything unknown to `General`.
    pub fn parse_lossy(s: &str) -> Self {
        s.parse().unwrap_or(DocumentType::General)
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = ParseDocumentTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| ParseDocumentTypeError(s.to_string()))
    }
}
