//! Parsing of cached reference files into text units
//!
//! PDFs are read page by page with lopdf (falling back to pdf-extract for
//! whole-document extraction), DOCX files become a single unit. Files of any
//! other kind are skipped with a warning.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use shared_docx::DocxPackage;

use crate::document::ReferenceUnit;
use crate::error::{CorpusError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Pdf,
    Docx,
}

impl ReferenceKind {
    pub fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "pdf" => Some(ReferenceKind::Pdf),
            "docx" => Some(ReferenceKind::Docx),
            _ => None,
        }
    }
}

/// Files to index: the fetched references first (in configuration order),
/// then any other supported file placed manually in `reference_dir`.
pub fn reference_files(reference_dir: &Path, fetched: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fetched.to_vec();
    let known: BTreeSet<PathBuf> = fetched.iter().cloned().collect();

    if reference_dir.is_dir() {
        let mut extra: Vec<PathBuf> = std::fs::read_dir(reference_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && ReferenceKind::of(p).is_some() && !known.contains(p))
            .collect();
        extra.sort();
        files.extend(extra);
    }

    Ok(files)
}

/// Parse every file into units. Unsupported kinds and unreadable files are
/// logged and skipped, never fatal.
pub fn load_units(paths: &[PathBuf]) -> Vec<ReferenceUnit> {
    let mut units = Vec::new();

    for path in paths {
        let Some(kind) = ReferenceKind::of(path) else {
            tracing::warn!("Skipping unsupported reference file type: {}", path.display());
            continue;
        };

        let loaded = match kind {
            ReferenceKind::Pdf => load_pdf(path),
            ReferenceKind::Docx => load_docx(path),
        };

        match loaded {
            Ok(mut parsed) => {
                tracing::debug!("Loaded {} unit(s) from {}", parsed.len(), path.display());
                units.append(&mut parsed);
            }
            Err(e) => tracing::warn!("Failed to load {}: {}", path.display(), e),
        }
    }

    units
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn parse_error(path: &Path, message: impl ToString) -> CorpusError {
    CorpusError::Parse {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

pub fn load_pdf(path: &Path) -> Result<Vec<ReferenceUnit>> {
    let source = source_name(path);

    let per_page = lopdf::Document::load(path).map(|doc| {
        doc.get_pages()
            .keys()
            .filter_map(|&page| {
                let text = doc.extract_text(&[page]).ok()?;
                (!text.trim().is_empty())
                    .then(|| ReferenceUnit::new(text, &source).with_page(page))
            })
            .collect::<Vec<_>>()
    });

    match per_page {
        Ok(units) if !units.is_empty() => Ok(units),
        _ => {
            let text = pdf_extract::extract_text(path).map_err(|e| parse_error(path, e))?;
            if text.trim().is_empty() {
                return Err(parse_error(path, "no extractable text"));
            }
            Ok(vec![ReferenceUnit::new(text, &source)])
        }
    }
}

pub fn load_docx(path: &Path) -> Result<Vec<ReferenceUnit>> {
    let package = DocxPackage::open(path).map_err(|e| parse_error(path, e))?;
    let text = package
        .paragraph_texts()
        .map_err(|e| parse_error(path, e))?
        .join("\n");
    if text.trim().is_empty() {
        return Err(parse_error(path, "document has no text"));
    }
    Ok(vec![ReferenceUnit::new(text, &source_name(path))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SOURCE_KEY;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reference_kind() {
        assert_eq!(ReferenceKind::of(Path::new("a/B.PDF")), Some(ReferenceKind::Pdf));
        assert_eq!(ReferenceKind::of(Path::new("a/b.docx")), Some(ReferenceKind::Docx));
        assert_eq!(ReferenceKind::of(Path::new("a/b.doc")), None);
        assert_eq!(ReferenceKind::of(Path::new("a/b")), None);
    }

    #[test]
    fn test_docx_reference_becomes_one_unit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.docx");
        DocxPackage::from_paragraphs(&["Governing law", "ADGM Courts"])
            .save(&path)
            .unwrap();

        let units = load_units(&[path]);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text, "Governing law\nADGM Courts");
        assert_eq!(units[0].metadata[SOURCE_KEY], "template.docx");
    }

    #[test]
    fn test_unsupported_and_broken_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        let broken = dir.path().join("broken.pdf");
        std::fs::write(&notes, "plain text").unwrap();
        std::fs::write(&broken, "not a pdf").unwrap();

        assert!(load_units(&[notes, broken]).is_empty());
    }

    #[test]
    fn test_manually_placed_files_follow_fetched_ones() {
        let dir = tempfile::tempdir().unwrap();
        let fetched = dir.path().join("z-fetched.pdf");
        for name in ["z-fetched.pdf", "b-manual.docx", "a-manual.pdf", "readme.md"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let files = reference_files(dir.path(), &[fetched.clone()]).unwrap();
        assert_eq!(
            files,
            vec![
                fetched,
                dir.path().join("a-manual.pdf"),
                dir.path().join("b-manual.docx"),
            ]
        );
    }
}
