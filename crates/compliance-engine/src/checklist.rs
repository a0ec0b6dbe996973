//! Checklist tables: required documents per process, process detection and
//! document-type classification.
//!
//! Every table is an ordered slice. Where several entries could match, the
//! earlier one wins.

use shared_types::UNKNOWN_DOC_TYPE;

pub const COMPANY_INCORPORATION: &str = "Company Incorporation";
pub const EMPLOYMENT_HR: &str = "Employment & HR";

/// Process assumed when no filename hints at one
pub const DEFAULT_PROCESS: &str = COMPANY_INCORPORATION;

/// Documents each process must include, in checklist order
pub const REQUIRED_DOCS: &[(&str, &[&str])] = &[
    (
        COMPANY_INCORPORATION,
        &[
            "Articles of Association",
            "Memorandum of Association",
            "Board Resolution",
            "Shareholder Resolution",
            "UBO Declaration Form",
            "Register of Members and Directors",
            "Incorporation Application Form",
        ],
    ),
    (
        EMPLOYMENT_HR,
        &["Employment Contract", "Offer Letter", "Employee Handbook"],
    ),
];

/// Filename keywords per process, in detection priority order
pub const PROCESS_KEYWORDS: &[(&str, &[&str])] = &[
    (
        COMPANY_INCORPORATION,
        &["incorporation", "articles", "memorandum", "ubo", "register"],
    ),
    (EMPLOYMENT_HR, &["employment", "contract", "hr"]),
];

/// Keywords per document type; table order is the tie-break
pub const DOC_TYPE_KEYWORDS: &[(&str, &[&str])] = &[
    ("Articles of Association", &["articles of association", "aoa"]),
    ("Memorandum of Association", &["memorandum of association", "moa", "mou"]),
    ("Board Resolution", &["board resolution"]),
    ("Shareholder Resolution", &["shareholder resolution"]),
    ("UBO Declaration Form", &["ubo", "ultimate beneficial owner"]),
    (
        "Register of Members and Directors",
        &["register of members", "register of directors"],
    ),
    (
        "Incorporation Application Form",
        &["incorporation application", "application form"],
    ),
    (
        "Employment Contract",
        &["employment contract", "standard employment contract"],
    ),
];

/// Known process names, in priority order
pub fn processes() -> impl Iterator<Item = &'static str> {
    REQUIRED_DOCS.iter().map(|(process, _)| *process)
}

/// Required document types for `process`. Unknown processes require nothing.
pub fn required_documents(process: &str) -> &'static [&'static str] {
    REQUIRED_DOCS
        .iter()
        .find(|(name, _)| *name == process)
        .map(|(_, docs)| *docs)
        .unwrap_or(&[])
}

/// Guess the process from upload filenames.
///
/// Only the presence of a keyword in some filename matters, so the result
/// does not depend on the order of `filenames`.
pub fn detect_process<S: AsRef<str>>(filenames: &[S]) -> &'static str {
    let lowered: Vec<String> = filenames.iter().map(|f| f.as_ref().to_lowercase()).collect();

    PROCESS_KEYWORDS
        .iter()
        .find(|(_, keywords)| {
            lowered
                .iter()
                .any(|name| keywords.iter().any(|k| name.contains(k)))
        })
        .map(|(process, _)| *process)
        .unwrap_or(DEFAULT_PROCESS)
}

/// Classify a document by its filename and extracted text.
///
/// Returns [`UNKNOWN_DOC_TYPE`] when no keyword matches.
pub fn classify_document(filename: &str, text: &str) -> &'static str {
    let haystack = format!("{} {}", filename.to_lowercase(), text.to_lowercase());

    DOC_TYPE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(doc_type, _)| *doc_type)
        .unwrap_or(UNKNOWN_DOC_TYPE)
}

/// Required documents of `process` not covered by any classified type.
/// "Unknown" never satisfies a requirement.
pub fn missing_documents<'a, I>(process: &str, classified: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let present: Vec<&str> = classified
        .into_iter()
        .filter(|t| *t != UNKNOWN_DOC_TYPE)
        .collect();

    required_documents(process)
        .iter()
        .filter(|doc| !present.contains(doc))
        .map(|doc| doc.to_string())
        .collect()
}
