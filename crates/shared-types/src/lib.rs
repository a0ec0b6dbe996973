pub mod types;

pub use types::{
    AnalysisReport, DocumentInfo, Issue, IssueRecord, ReviewedDocument, Severity, UNKNOWN_DOC_TYPE,
};
