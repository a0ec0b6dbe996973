//! Run configuration: where uploads are reviewed and reports written

use std::path::{Path, PathBuf};

use compliance_engine::DEFAULT_RETRIEVAL_K;
use shared_docx::MAX_EXTRACT_CHARS;

use crate::error::{ReviewError, Result};

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Reviewed copies land here as `<stem>_REVIEWED.docx`
    pub reviewed_dir: PathBuf,
    /// Fixed location of the JSON report
    pub report_path: PathBuf,
    /// Reference cache shared with the corpus loader
    pub reference_dir: PathBuf,
    /// Sample uploads for manual runs
    pub samples_dir: PathBuf,
    /// Characters of each upload analysed
    pub max_extract_chars: usize,
    /// Hits requested per citation lookup
    pub retrieval_k: usize,
}

impl RunConfig {
    /// `<output_root>/reviewed`, `<output_root>/reports/report.json`,
    /// `<data_root>/reference` and `<data_root>/samples`
    pub fn new(output_root: impl AsRef<Path>, data_root: impl AsRef<Path>) -> Self {
        let output_root = output_root.as_ref();
        let data_root = data_root.as_ref();
        Self {
            reviewed_dir: output_root.join("reviewed"),
            report_path: output_root.join("reports").join("report.json"),
            reference_dir: data_root.join("reference"),
            samples_dir: data_root.join("samples"),
            max_extract_chars: MAX_EXTRACT_CHARS,
            retrieval_k: DEFAULT_RETRIEVAL_K,
        }
    }

    /// Load configuration from environment variables
    ///
    /// Expected variables:
    /// - REVIEW_OUTPUT_DIR: Root for reviewed copies and reports (default: "./outputs")
    /// - REVIEW_DATA_DIR: Root for reference and sample files (default: "./data")
    pub fn from_env() -> Self {
        let output_root =
            std::env::var("REVIEW_OUTPUT_DIR").unwrap_or_else(|_| "./outputs".to_string());
        let data_root = std::env::var("REVIEW_DATA_DIR").unwrap_or_else(|_| "./data".to_string());
        Self::new(output_root, data_root)
    }

    /// Create every directory the run writes to. Idempotent.
    pub fn ensure_dirs(&self) -> Result<()> {
        let report_dir = self.report_path.parent().unwrap_or(Path::new("."));
        for dir in [
            self.reviewed_dir.as_path(),
            report_dir,
            self.reference_dir.as_path(),
            self.samples_dir.as_path(),
        ] {
            std::fs::create_dir_all(dir).map_err(|source| ReviewError::Output {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new("outputs", "data")
    }
}
