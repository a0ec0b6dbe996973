use crate::patterns::{all_matches, WEAK_LANGUAGE};
use crate::rules::{CitationQuery, Finding};
use shared_types::Severity;

pub const WEAK_LANGUAGE_FALLBACK: &str = "ADGM Guidance/Template";

pub fn weak_language_query(doc_type: &str) -> String {
    format!("binding language {} ADGM template clause shall must", doc_type)
}

/// One Medium finding per weak-commitment phrase present, in table order.
pub fn check_weak_language(text_lower: &str, doc_type: &str) -> Vec<Finding> {
    all_matches(text_lower, WEAK_LANGUAGE)
        .into_iter()
        .map(|phrase| Finding {
            description: format!("Ambiguous/weak obligation: '{}'", phrase),
            severity: Severity::Medium,
            suggestion: "Prefer firm language ('shall', specific obligations).".to_string(),
            citation: CitationQuery {
                query: weak_language_query(doc_type),
                fallback: WEAK_LANGUAGE_FALLBACK,
            },
        })
        .collect()
}
