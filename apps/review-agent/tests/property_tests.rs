//! Property-based tests for review-agent
//!
//! Tests the process hint and checklist invariants of the pipeline using proptest.

use std::path::Path;

use corpus_core::{RetrievedChunk, Retriever};
use proptest::prelude::*;
use review_agent::{analyze_documents, ProcessHint, RunConfig};
use shared_docx::DocxPackage;

struct NoReferences;

impl Retriever for NoReferences {
    fn retrieve(&self, _query: &str, _k: usize) -> corpus_core::Result<Vec<RetrievedChunk>> {
        Ok(Vec::new())
    }
}

/// Upload names for the incorporation and employment checklists
fn upload_name() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "AoA.docx",
        "MoA.docx",
        "board_resolution.docx",
        "shareholder_resolution.docx",
        "ubo.docx",
        "register_of_members.docx",
        "incorporation_application.docx",
        "employment_contract.docx",
        "notes.docx",
    ])
}

fn analyze(dir: &Path, names: &[&str], hint: &ProcessHint) -> shared_types::AnalysisReport {
    let uploads: Vec<_> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            // Distinct file per upload; the original name drives classification
            let path = dir.join(format!("{}-{}", i, name));
            DocxPackage::from_paragraphs(&["Signed by the director"])
                .save(&path)
                .unwrap();
            (name.to_string(), path)
        })
        .collect();
    let run = RunConfig::new(dir.join("outputs"), dir.join("data"));
    analyze_documents(&uploads, &NoReferences, hint, &run).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // ============================================================
    // Process Hint Tests
    // ============================================================

    #[test]
    fn named_hints_round_trip(name in "[A-Z][A-Za-z &]{0,30}") {
        let trimmed = name.trim().to_string();
        prop_assume!(!trimmed.eq_ignore_ascii_case("auto"));
        prop_assert_eq!(name.parse::<ProcessHint>().unwrap(), ProcessHint::Named(trimmed));
    }

    // ============================================================
    // Checklist Invariants
    // ============================================================

    #[test]
    fn uploaded_types_are_never_missing(names in prop::collection::vec(upload_name(), 1..6)) {
        let dir = tempfile::tempdir().unwrap();
        let report = analyze(dir.path(), &names, &ProcessHint::Auto);

        prop_assert_eq!(report.documents_uploaded, names.len());
        prop_assert!(report.missing_documents.len() <= report.required_documents);
        for name in &names {
            let doc_type = compliance_engine::classify_document(name, "Signed by the director");
            prop_assert!(!report.missing_documents.iter().any(|m| m == doc_type));
        }
    }

    #[test]
    fn processes_without_requirements_miss_nothing(names in prop::collection::vec(upload_name(), 0..4)) {
        let dir = tempfile::tempdir().unwrap();
        let report = analyze(dir.path(), &names, &ProcessHint::Named("Licensing".to_string()));

        prop_assert_eq!(report.required_documents, 0);
        prop_assert!(report.missing_documents.is_empty());
    }
}
