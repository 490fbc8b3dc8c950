//! Advisory quality checks on a finished summary.

use serde::Serialize;

use crate::types::SummaryResponse;

const MIN_SUMMARY_CHARS: usize = 50;
const MAX_SUMMARY_CHARS: usize = 2000;
const PLACEHOLDERS: [&str; 4] = ["error", "failed", "unable to summarize", "no content"];

/// Outcome of [`validate_summary`]. Never alters the response it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryValidation {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub character_count: usize,
}

pub fn validate_summary(response: &SummaryResponse) -> SummaryValidation {
    let summary = response.summary.trim();
    let character_count = summary.chars().count();
    let mut issues = Vec::new();

    if summary.is_empty() {
        issues.push("summary is empty".to_string());
    } else {
        if character_count < MIN_SUMMARY_CHARS {
            issues.push(format!(
                "summary is too short ({character_count} < {MIN_SUMMARY_CHARS} characters)"
            ));
        }
        if character_count > MAX_SUMMARY_CHARS {
            issues.push(format!(
                "summary is too long ({character_count} > {MAX_SUMMARY_CHARS} characters)"
            ));
        }
        let lowered = summary.to_lowercase();
        let bare = lowered.trim_end_matches(['.', '!']);
        if PLACEHOLDERS.contains(&bare) {
            issues.push(format!("summary is a placeholder ({summary:?})"));
        }
    }

    SummaryValidation {
        is_valid: issues.is_empty(),
        issues,
        character_count,
    }
}
