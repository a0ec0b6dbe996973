//! Red-flag rules
//!
//! Each rule is a pure scan of lower-cased document text. A rule reports what
//! it found together with the reference query that should back it up; looking
//! the citation up is left to the detector.

pub mod jurisdiction;
pub mod signature;
pub mod weak_language;

use shared_types::Severity;

/// Reference lookup attached to a finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationQuery {
    pub query: String,
    /// Label used when the reference index has nothing to offer
    pub fallback: &'static str,
}

/// One red flag raised by a rule, before its citation is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub description: String,
    pub severity: Severity,
    pub suggestion: String,
    pub citation: CitationQuery,
}
