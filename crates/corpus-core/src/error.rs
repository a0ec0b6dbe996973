use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while preparing or querying the reference corpus
#[derive(Debug, Error)]
pub enum CorpusError {
    /// A reference could not be downloaded after all retries
    #[error("Failed to fetch {url} after {attempts} attempt(s): {message}")]
    Fetch {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A cached reference file could not be turned into text
    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Nothing usable in the reference directory to build an index from
    #[error("No reference documents could be loaded from {}", reference_dir.display())]
    EmptyCorpus { reference_dir: PathBuf },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Persisted index missing, corrupt or built with a different model
    #[error("Index unavailable: {0}")]
    Index(String),
}

impl From<candle_core::Error> for CorpusError {
    fn from(err: candle_core::Error) -> Self {
        CorpusError::Embedding(err.to_string())
    }
}

impl From<serde_json::Error> for CorpusError {
    fn from(err: serde_json::Error) -> Self {
        CorpusError::Index(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CorpusError>;
