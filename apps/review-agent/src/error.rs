//! Error types for a review run
//!
//! Every variant is fatal to the current run. The message names what failed
//! and ends with what a person can do about it.

use std::path::{Path, PathBuf};

use corpus_core::fetch::local_file_name;
use corpus_core::CorpusError;
use shared_docx::DocxError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error(
        "Could not download reference {url} after {attempts} attempt(s): {message}. \
         Place the file into {} as {file_name} and retry.",
        reference_dir.display()
    )]
    ReferenceFetch {
        url: String,
        attempts: u32,
        message: String,
        reference_dir: PathBuf,
        file_name: String,
    },

    #[error(
        "No usable reference documents in {}. \
         Place ADGM reference PDF or DOCX files there and retry.",
        reference_dir.display()
    )]
    EmptyCorpus { reference_dir: PathBuf },

    #[error(
        "Reference index could not be prepared: {source}. \
         Check the reference files and retry with --force-rebuild."
    )]
    Index {
        #[source]
        source: CorpusError,
    },

    #[error(
        "Could not read uploaded document {name}: {source}. \
         Make sure it is a valid .docx file and upload it again."
    )]
    Document {
        name: String,
        #[source]
        source: DocxError,
    },

    #[error(
        "Could not write {}: {source}. Check that the output directory is writable.",
        path.display()
    )]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Report could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ReviewError {
    /// Map a corpus failure, pointing remediation at `reference_dir`.
    pub fn from_corpus(err: CorpusError, reference_dir: &Path) -> Self {
        match err {
            CorpusError::Fetch {
                url,
                attempts,
                message,
            } => ReviewError::ReferenceFetch {
                file_name: local_file_name(&url),
                url,
                attempts,
                message,
                reference_dir: reference_dir.to_path_buf(),
            },
            CorpusError::EmptyCorpus { reference_dir } => ReviewError::EmptyCorpus { reference_dir },
            other => ReviewError::Index { source: other },
        }
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;
