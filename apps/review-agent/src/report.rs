//! Report assembly and persistence

use std::path::{Path, PathBuf};

use shared_types::{AnalysisReport, Issue, IssueRecord, ReviewedDocument};

use crate::error::{ReviewError, Result};

/// Collects checklist results, issues and reviewed copies for one run.
///
/// Issues and reviewed copies are kept in the order they are added, which is
/// upload order when the pipeline drives it.
#[derive(Debug, Clone)]
pub struct ReportAssembler {
    report: AnalysisReport,
    reviewed: Vec<ReviewedDocument>,
}

impl ReportAssembler {
    pub fn new(
        process: &str,
        documents_uploaded: usize,
        required_documents: usize,
        missing_documents: Vec<String>,
    ) -> Self {
        Self {
            report: AnalysisReport {
                process: process.to_string(),
                documents_uploaded,
                required_documents,
                missing_documents,
                issues_found: Vec::new(),
                reviewed_paths: Vec::new(),
                report_path: None,
            },
            reviewed: Vec::new(),
        }
    }

    /// Record the issues of one document under its report label.
    pub fn add_issues(&mut self, document: &str, issues: &[Issue]) {
        self.report
            .issues_found
            .extend(issues.iter().map(|issue| IssueRecord::new(document, issue)));
    }

    pub fn add_reviewed(&mut self, original_name: &str, path: PathBuf) {
        self.reviewed.push(ReviewedDocument {
            original_name: original_name.to_string(),
            path,
        });
    }

    /// Report as persisted: checklist and issue fields only
    pub fn report(&self) -> &AnalysisReport {
        &self.report
    }

    /// Write the report as pretty-printed JSON to `path` and return it with
    /// the reviewed copies and the report location filled in.
    pub fn write(self, path: &Path) -> Result<AnalysisReport> {
        let json = serde_json::to_string_pretty(&self.report)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ReviewError::Output {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, json).map_err(|source| ReviewError::Output {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(
            "Report written to {} ({} issue(s), {} missing document(s))",
            path.display(),
            self.report.issues_found.len(),
            self.report.missing_documents.len()
        );

        let mut report = self.report;
        report.reviewed_paths = self.reviewed;
        report.report_path = Some(path.to_path_buf());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shared_types::Severity;

    fn issue() -> Issue {
        Issue {
            description: "Jurisdiction references onshore UAE/Federal Courts".to_string(),
            severity: Severity::High,
            suggestion: "Update governing law and forum to ADGM Courts.".to_string(),
            citation: "ADGM Regulation".to_string(),
        }
    }

    #[test]
    fn test_persisted_json_has_only_report_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("report.json");

        let mut assembler = ReportAssembler::new("Company Incorporation", 1, 7, vec!["Board Resolution".to_string()]);
        assembler.add_issues("Articles of Association", &[issue()]);
        assembler.add_reviewed("AoA.docx", dir.path().join("AoA_REVIEWED.docx"));
        let report = assembler.write(&path).unwrap();

        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let mut keys: Vec<&str> = on_disk
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "documents_uploaded",
                "issues_found",
                "missing_documents",
                "process",
                "required_documents",
            ]
        );
        assert_eq!(on_disk["issues_found"][0]["section"], "N/A");
        assert_eq!(on_disk["issues_found"][0]["severity"], "High");

        assert_eq!(report.reviewed_paths.len(), 1);
        assert_eq!(report.report_path, Some(path));
    }

    #[test]
    fn test_issues_keep_insertion_order() {
        let mut assembler = ReportAssembler::new("Employment & HR", 2, 3, Vec::new());
        assembler.add_issues("Employment Contract", &[issue()]);
        assembler.add_issues("notes.docx", &[issue(), issue()]);

        let documents: Vec<&str> = assembler
            .report()
            .issues_found
            .iter()
            .map(|r| r.document.as_str())
            .collect();
        assert_eq!(documents, vec!["Employment Contract", "notes.docx", "notes.docx"]);
    }
}
