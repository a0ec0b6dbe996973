use crate::patterns::{contains_any, SIGNATURE_KEYS};
use crate::rules::{CitationQuery, Finding};
use shared_types::Severity;

pub const SIGNATURE_FALLBACK: &str = "ADGM Template";

pub fn signature_query(doc_type: &str) -> String {
    format!("{} signature block ADGM template", doc_type)
}

/// Flags a document with no trace of a signatory block.
///
/// Any signature keyword anywhere in the text counts as present, so short
/// words like "name" or "date" make this rule lenient.
pub fn check_signature_block(text_lower: &str, doc_type: &str) -> Option<Finding> {
    if contains_any(text_lower, SIGNATURE_KEYS) {
        return None;
    }

    Some(Finding {
        description: "Missing or incomplete signatory section.".to_string(),
        severity: Severity::High,
        suggestion: "Add an authorised signatory block with name, title, date, signature."
            .to_string(),
        citation: CitationQuery {
            query: signature_query(doc_type),
            fallback: SIGNATURE_FALLBACK,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_block() {
        let finding = check_signature_block("the parties agree as follows", "Board Resolution").unwrap();
        assert_eq!(finding.severity, Severity::High);
        assert_eq!(finding.citation.query, "Board Resolution signature block ADGM template");
    }

    #[test]
    fn test_any_key_counts() {
        assert!(check_signature_block("signed by the director", "x").is_none());
        assert!(check_signature_block("authorised signatory: ____", "x").is_none());
        // "date" inside "mandated" is still a match
        assert!(check_signature_block("as mandated", "x").is_none());
    }
}
