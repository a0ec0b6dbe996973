use crate::patterns::{first_match, BAD_JURISDICTION};
use crate::rules::{CitationQuery, Finding};
use shared_types::Severity;

pub const JURISDICTION_QUERY: &str = "ADGM jurisdiction clause Companies Regulations courts venue";
pub const JURISDICTION_FALLBACK: &str = "ADGM Regulation";

/// Flags a governing-law or forum clause that points at onshore UAE courts.
///
/// At most one finding per document, however many onshore forums are named.
/// `text_lower` must already be lower-cased.
pub fn check_jurisdiction(text_lower: &str) -> Option<Finding> {
    let phrase = first_match(text_lower, BAD_JURISDICTION)?;
    tracing::debug!("Jurisdiction phrase found: {}", phrase);

    Some(Finding {
        description: "Jurisdiction references onshore UAE/Federal Courts".to_string(),
        severity: Severity::High,
        suggestion: "Update governing law and forum to ADGM Courts.".to_string(),
        citation: CitationQuery {
            query: JURISDICTION_QUERY.to_string(),
            fallback: JURISDICTION_FALLBACK,
        },
    })
}
