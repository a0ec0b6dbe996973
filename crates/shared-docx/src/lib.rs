//! Shared DOCX handling utilities
//!
//! Reads WordprocessingML packages, extracts paragraph text and writes
//! reviewed copies carrying one comment per flagged issue.

pub mod comments;
pub mod error;
pub mod package;
pub mod paragraphs;

pub use comments::{AnnotationOutcome, Annotator, CommentPlacement, REVIEWED_SUFFIX};
pub use error::{DocxError, Result};
pub use package::DocxPackage;
pub use paragraphs::Paragraph;

use std::path::Path;

/// Default cap on extracted characters per document
pub const MAX_EXTRACT_CHARS: usize = 20_000;

/// Extract the plain text of a `.docx` file: paragraph texts joined by
/// newlines, truncated to `max_chars` characters.
pub fn extract_text(path: &Path, max_chars: usize) -> Result<String> {
    let package = DocxPackage::open(path)?;
    let text = package.paragraph_texts()?.join("\n");
    Ok(truncate_chars(&text, max_chars))
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_joins_paragraphs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aoa.docx");
        DocxPackage::from_paragraphs(&["Articles of Association", "", "Signed by the director"])
            .save(&path)
            .unwrap();

        let text = extract_text(&path, MAX_EXTRACT_CHARS).unwrap();
        assert_eq!(text, "Articles of Association\n\nSigned by the director");
    }

    #[test]
    fn test_extract_text_truncates_on_char_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arabic.docx");
        DocxPackage::from_paragraphs(&["ééééé"]).save(&path).unwrap();

        assert_eq!(extract_text(&path, 3).unwrap(), "ééé");
    }

    #[test]
    fn test_extract_text_rejects_non_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.docx");
        std::fs::write(&path, b"not a zip").unwrap();

        assert!(matches!(
            extract_text(&path, MAX_EXTRACT_CHARS),
            Err(DocxError::Zip(_))
        ));
    }
}
