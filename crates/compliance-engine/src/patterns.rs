//! Keyword tables for the red-flag rules
//!
//! All matching is plain substring search on lower-cased text. Table order is
//! significant: issues are emitted in the order their phrases appear here.

/// Onshore / federal forums that should read "ADGM Courts" in an ADGM filing
pub const BAD_JURISDICTION: &[&str] = &["uae federal court", "dubai courts", "onshore uae"];

/// Phrases that water down an obligation
pub const WEAK_LANGUAGE: &[&str] = &[
    "may at its discretion",
    "best efforts",
    "commercially reasonable efforts",
];

/// Evidence of a signatory block; any one is enough
pub const SIGNATURE_KEYS: &[&str] = &[
    "signature",
    "signed by",
    "authorised signatory",
    "authorized signatory",
    "date",
    "name",
];

/// True if the lower-cased `haystack` contains any keyword
pub fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| haystack.contains(k))
}

/// First keyword (in table order) contained in the lower-cased `haystack`
pub fn first_match<'a>(haystack: &str, keywords: &[&'a str]) -> Option<&'a str> {
    keywords.iter().copied().find(|k| haystack.contains(k))
}

/// Every keyword contained in the lower-cased `haystack`, in table order
pub fn all_matches<'a>(haystack: &str, keywords: &[&'a str]) -> Vec<&'a str> {
    keywords
        .iter()
        .copied()
        .filter(|k| haystack.contains(k))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_follows_table_order() {
        let text = "onshore uae and dubai courts";
        assert_eq!(first_match(text, BAD_JURISDICTION), Some("dubai courts"));
    }

    #[test]
    fn test_all_matches_follow_table_order() {
        let text = "best efforts ... may at its discretion";
        assert_eq!(
            all_matches(text, WEAK_LANGUAGE),
            vec!["may at its discretion", "best efforts"]
        );
    }

    #[test]
    fn test_contains_any() {
        assert!(contains_any("signed by the director", SIGNATURE_KEYS));
        assert!(!contains_any("no such block here", SIGNATURE_KEYS));
    }
}
