//! Document analysis pipeline
//!
//! Classify each upload, work out which required documents are missing, scan
//! every document for red flags, annotate flagged documents and persist the
//! report. Documents are processed one at a time in upload order.

use std::collections::HashSet;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use compliance_engine::{
    classify_document, detect_process, missing_documents, required_documents, RedFlagDetector,
};
use corpus_core::{CorpusConfig, Embedder, Retriever, VectorIndex};
use shared_docx::Annotator;
use shared_types::{AnalysisReport, DocumentInfo};

use crate::config::RunConfig;
use crate::error::{ReviewError, Result};
use crate::report::ReportAssembler;

/// Which checklist to verify the uploads against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessHint {
    /// Detect the process from upload filenames
    Auto,
    /// Use this process name as given
    Named(String),
}

impl ProcessHint {
    pub fn resolve<S: AsRef<str>>(&self, filenames: &[S]) -> String {
        match self {
            ProcessHint::Auto => detect_process(filenames).to_string(),
            ProcessHint::Named(name) => name.clone(),
        }
    }
}

impl FromStr for ProcessHint {
    type Err = Infallible;

    /// "auto" (any case) or an empty string means detection
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            Ok(ProcessHint::Auto)
        } else {
            Ok(ProcessHint::Named(trimmed.to_string()))
        }
    }
}

/// Open the persisted reference index, rebuilding it when needed.
pub async fn open_reference_index(
    corpus: &CorpusConfig,
    embedder: Arc<dyn Embedder>,
    force_rebuild: bool,
) -> Result<VectorIndex> {
    VectorIndex::open_or_build(corpus, embedder, force_rebuild)
        .await
        .map_err(|e| ReviewError::from_corpus(e, &corpus.reference_dir))
}

/// Read and classify one upload.
pub fn inspect_document(original_name: &str, path: &Path, run: &RunConfig) -> Result<DocumentInfo> {
    let extracted_text = shared_docx::extract_text(path, run.max_extract_chars).map_err(|source| {
        ReviewError::Document {
            name: original_name.to_string(),
            source,
        }
    })?;
    let classified_type = classify_document(original_name, &extracted_text).to_string();

    tracing::info!("Classified {} as {}", original_name, classified_type);

    Ok(DocumentInfo {
        original_name: original_name.to_string(),
        local_path: path.to_path_buf(),
        classified_type,
        extracted_text,
    })
}

/// Analyse a batch of uploads.
///
/// `uploads` pairs each original filename with the local file holding it.
/// Writes a reviewed copy of every flagged document and the JSON report, and
/// returns the report with those artifact paths attached.
pub fn analyze_documents(
    uploads: &[(String, PathBuf)],
    retriever: &dyn Retriever,
    hint: &ProcessHint,
    run: &RunConfig,
) -> Result<AnalysisReport> {
    run.ensure_dirs()?;

    let documents = uploads
        .iter()
        .map(|(name, path)| inspect_document(name, path, run))
        .collect::<Result<Vec<_>>>()?;

    let filenames: Vec<&str> = uploads.iter().map(|(name, _)| name.as_str()).collect();
    let process = hint.resolve(&filenames);
    let required = required_documents(&process);
    let missing = missing_documents(&process, documents.iter().map(|d| d.classified_type.as_str()));

    tracing::info!(
        "Process: {} ({} required, {} missing)",
        process,
        required.len(),
        missing.len()
    );

    let detector = RedFlagDetector::new(run.retrieval_k);
    let annotator = Annotator::new(&run.reviewed_dir);
    let mut assembler = ReportAssembler::new(&process, uploads.len(), required.len(), missing);
    let mut claimed: HashSet<PathBuf> = HashSet::new();

    for document in &documents {
        let issues = detector.detect(&document.extracted_text, &document.classified_type, retriever);
        tracing::info!("{}: {} issue(s)", document.original_name, issues.len());

        if issues.is_empty() {
            continue;
        }

        let reviewed_path = unclaimed_reviewed_path(&annotator, &document.local_path, &mut claimed);
        match annotator.annotate_to(&document.local_path, &issues, reviewed_path) {
            Ok(outcome) => {
                if outcome.fallback_count() > 0 {
                    tracing::info!(
                        "{}: {} comment(s) added as inline highlights",
                        document.original_name,
                        outcome.fallback_count()
                    );
                }
                assembler.add_reviewed(&document.original_name, outcome.reviewed_path);
            }
            Err(e) => {
                tracing::warn!(
                    "No reviewed copy for {}: annotation failed: {}",
                    document.original_name,
                    e
                );
            }
        }

        assembler.add_issues(document.report_label(), &issues);
    }

    assembler.write(&run.report_path)
}

/// Reviewed copy path not yet used in this run. Uploads sharing a file stem
/// get a numbered suffix instead of overwriting each other.
fn unclaimed_reviewed_path(annotator: &Annotator, document_path: &Path, claimed: &mut HashSet<PathBuf>) -> PathBuf {
    let mut copy = 1;
    let mut path = annotator.reviewed_path_numbered(document_path, copy);
    while claimed.contains(&path) {
        copy += 1;
        path = annotator.reviewed_path_numbered(document_path, copy);
    }
    if copy > 1 {
        tracing::warn!(
            "{} shares its name with an earlier upload, writing {}",
            document_path.display(),
            path.display()
        );
    }
    claimed.insert(path.clone());
    path
}
