pub mod checklist;
pub mod patterns;
pub mod rules;

pub use checklist::{
    classify_document, detect_process, missing_documents, required_documents, DEFAULT_PROCESS,
};
pub use rules::{CitationQuery, Finding};

use corpus_core::Retriever;
use shared_types::Issue;

/// Hits requested per citation lookup
pub const DEFAULT_RETRIEVAL_K: usize = 4;

/// Red-flag detector entry point
///
/// Runs the jurisdiction, weak-language and signature rules over one
/// document and backs every finding with a reference citation.
#[derive(Debug, Clone)]
pub struct RedFlagDetector {
    k: usize,
}

impl RedFlagDetector {
    pub fn new(k: usize) -> Self {
        Self { k: k.max(1) }
    }

    /// Rule findings for one document, without citations.
    ///
    /// Order: jurisdiction, weak language (phrase-table order), signature.
    pub fn scan(&self, text: &str, doc_type: &str) -> Vec<Finding> {
        let text_lower = text.to_lowercase();

        let mut findings = Vec::new();
        findings.extend(rules::jurisdiction::check_jurisdiction(&text_lower));
        findings.extend(rules::weak_language::check_weak_language(&text_lower, doc_type));
        findings.extend(rules::signature::check_signature_block(&text_lower, doc_type));
        findings
    }

    /// Findings for one document with citations resolved against `retriever`.
    pub fn detect(&self, text: &str, doc_type: &str, retriever: &dyn Retriever) -> Vec<Issue> {
        self.scan(text, doc_type)
            .into_iter()
            .map(|finding| {
                let citation = self.resolve_citation(&finding.citation, retriever);
                Issue {
                    description: finding.description,
                    severity: finding.severity,
                    suggestion: finding.suggestion,
                    citation,
                }
            })
            .collect()
    }

    /// Source of the top hit, or the fallback label. Never empty, never fails.
    pub fn resolve_citation(&self, query: &CitationQuery, retriever: &dyn Retriever) -> String {
        match retriever.retrieve(&query.query, self.k) {
            Ok(hits) => hits
                .first()
                .and_then(|hit| hit.source())
                .unwrap_or(query.fallback)
                .to_string(),
            Err(e) => {
                tracing::warn!(query = %query.query, "Citation lookup failed, using fallback: {}", e);
                query.fallback.to_string()
            }
        }
    }
}

impl Default for RedFlagDetector {
    fn default() -> Self {
        Self::new(DEFAULT_RETRIEVAL_K)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpus_core::{CorpusError, Metadata, RetrievedChunk};
    use pretty_assertions::assert_eq;
    use shared_types::Severity;

    /// Retriever answering every query with one fixed hit
    struct FixedRetriever(Option<&'static str>);

    impl Retriever for FixedRetriever {
        fn retrieve(&self, _query: &str, k: usize) -> corpus_core::Result<Vec<RetrievedChunk>> {
            let mut metadata = Metadata::new();
            if let Some(source) = self.0 {
                metadata.insert("source".to_string(), source.to_string());
            }
            let hit = RetrievedChunk {
                text: "reference".to_string(),
                metadata,
                score: 0.9,
            };
            Ok(std::iter::repeat(hit).take(k).collect())
        }
    }

    struct EmptyRetriever;

    impl Retriever for EmptyRetriever {
        fn retrieve(&self, _query: &str, _k: usize) -> corpus_core::Result<Vec<RetrievedChunk>> {
            Ok(Vec::new())
        }
    }

    struct FailingRetriever;

    impl Retriever for FailingRetriever {
        fn retrieve(&self, _query: &str, _k: usize) -> corpus_core::Result<Vec<RetrievedChunk>> {
            Err(CorpusError::Embedding("model unavailable".to_string()))
        }
    }

    #[test]
    fn test_single_jurisdiction_issue() {
        let detector = RedFlagDetector::default();
        let text = "Governed by the Dubai Courts, the UAE Federal Court and onshore UAE law. Signed by: ____";
        let issues = detector.detect(text, "Articles of Association", &EmptyRetriever);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::High);
        assert_eq!(issues[0].citation, "ADGM Regulation");
    }

    #[test]
    fn test_two_weak_language_issues() {
        let detector = RedFlagDetector::default();
        let text = "The Company may at its discretion and with best efforts ... Name: ____";
        let issues = detector.detect(text, "Employment Contract", &EmptyRetriever);

        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.severity == Severity::Medium));
        assert!(issues.iter().all(|i| i.citation == "ADGM Guidance/Template"));
    }

    #[test]
    fn test_missing_signature_comes_last() {
        let detector = RedFlagDetector::default();
        let text = "Disputes before the Dubai Courts. The employer uses best efforts.";
        let issues = detector.detect(text, "Employment Contract", &EmptyRetriever);

        let descriptions: Vec<&str> = issues.iter().map(|i| i.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec![
                "Jurisdiction references onshore UAE/Federal Courts",
                "Ambiguous/weak obligation: 'best efforts'",
                "Missing or incomplete signatory section.",
            ]
        );
        assert_eq!(issues[2].severity, Severity::High);
        assert_eq!(issues[2].citation, "ADGM Template");
    }

    #[test]
    fn test_clean_document_has_no_issues() {
        let detector = RedFlagDetector::default();
        let text = "The ADGM Courts have jurisdiction. Authorised signatory: ____";
        assert!(detector.detect(text, "Board Resolution", &EmptyRetriever).is_empty());
    }

    #[test]
    fn test_citation_uses_top_hit_source() {
        let detector = RedFlagDetector::default();
        let issues = detector.detect("dubai courts; signature", "x", &FixedRetriever(Some("checklist.pdf")));
        assert_eq!(issues[0].citation, "checklist.pdf");
    }

    #[test]
    fn test_citation_falls_back_without_source_or_on_error() {
        let detector = RedFlagDetector::default();
        let text = "dubai courts; signature";

        let no_source = detector.detect(text, "x", &FixedRetriever(None));
        assert_eq!(no_source[0].citation, "ADGM Regulation");

        let failed = detector.detect(text, "x", &FailingRetriever);
        assert_eq!(failed[0].citation, "ADGM Regulation");
    }
}
