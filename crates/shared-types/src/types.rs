use std::fmt;
use std::path::PathBuf;

/// Document type assigned when no keyword in the classification table matches.
pub const UNKNOWN_DOC_TYPE: &str = "Unknown";

/// One uploaded file, as seen by a single analysis run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DocumentInfo {
    pub original_name: String,
    pub local_path: PathBuf,
    pub classified_type: String,
    pub extracted_text: String,
}

impl DocumentInfo {
    pub fn is_classified(&self) -> bool {
        self.classified_type != UNKNOWN_DOC_TYPE
    }

    /// Label used for this document in the report: its type when known,
    /// otherwise the name it was uploaded under.
    pub fn report_label(&self) -> &str {
        if self.is_classified() {
            &self.classified_type
        } else {
            &self.original_name
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        };
        f.write_str(label)
    }
}

/// A red flag raised against one document.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Issue {
    pub description: String,
    pub severity: Severity,
    pub suggestion: String,
    pub citation: String, // never empty: retrieved source or a fixed fallback label
}

impl Issue {
    /// Text carried by the review comment inserted into the document.
    pub fn comment_text(&self) -> String {
        format!(
            "{} | Suggestion: {} | Source: {}",
            self.description, self.suggestion, self.citation
        )
    }
}

/// An issue as it appears in the report, tagged with its owning document.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IssueRecord {
    pub document: String,
    pub section: String,
    pub issue: String,
    pub severity: Severity,
    pub suggestion: String,
    pub citation: String,
}

impl IssueRecord {
    pub fn new(document: &str, issue: &Issue) -> Self {
        Self {
            document: document.to_string(),
            section: "N/A".to_string(),
            issue: issue.description.clone(),
            severity: issue.severity,
            suggestion: issue.suggestion.clone(),
            citation: issue.citation.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReviewedDocument {
    pub original_name: String,
    pub path: PathBuf,
}

/// Result of one analysis invocation.
///
/// The persisted JSON file only carries the checklist and issue fields;
/// `reviewed_paths` and `report_path` are filled in after the file is written.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisReport {
    pub process: String,
    pub documents_uploaded: usize,
    pub required_documents: usize,
    pub missing_documents: Vec<String>,
    pub issues_found: Vec<IssueRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reviewed_paths: Vec<ReviewedDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn issue() -> Issue {
        Issue {
            description: "Missing or incomplete signatory section.".to_string(),
            severity: Severity::High,
            suggestion: "Add an authorised signatory block.".to_string(),
            citation: "ADGM Template".to_string(),
        }
    }

    #[test]
    fn test_report_label_prefers_classified_type() {
        let mut info = DocumentInfo {
            original_name: "AoA.docx".to_string(),
            local_path: PathBuf::from("/tmp/x.docx"),
            classified_type: "Articles of Association".to_string(),
            extracted_text: String::new(),
        };
        assert_eq!(info.report_label(), "Articles of Association");

        info.classified_type = UNKNOWN_DOC_TYPE.to_string();
        assert!(!info.is_classified());
        assert_eq!(info.report_label(), "AoA.docx");
    }

    #[test]
    fn test_comment_text_joins_parts() {
        assert_eq!(
            issue().comment_text(),
            "Missing or incomplete signatory section. | Suggestion: Add an authorised signatory block. | Source: ADGM Template"
        );
    }

    #[test]
    fn test_severity_serializes_as_title_case() {
        assert_eq!(serde_json::to_string(&Severity::Medium).unwrap(), "\"Medium\"");
        assert_eq!(Severity::High.to_string(), "High");
    }

    #[test]
    fn test_persisted_report_omits_artifact_fields() {
        let report = AnalysisReport {
            process: "Company Incorporation".to_string(),
            documents_uploaded: 1,
            required_documents: 7,
            missing_documents: vec!["Board Resolution".to_string()],
            issues_found: vec![IssueRecord::new("AoA.docx", &issue())],
            reviewed_paths: Vec::new(),
            report_path: None,
        };
        let value = serde_json::to_value(&report).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "documents_uploaded",
                "issues_found",
                "missing_documents",
                "process",
                "required_documents"
            ]
        );
        assert_eq!(value["issues_found"][0]["section"], "N/A");
    }
}
