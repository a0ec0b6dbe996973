//! Configuration management for the reference corpus
//!
//! Handles reference locations, chunking, fetch policy and the embedding backend.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CorpusError, Result};

/// ADGM reference material indexed by default
pub const REFERENCE_URLS: &[&str] = &[
    // Checklists (PDF)
    "https://www.adgm.com/documents/registration-authority/registration-and-incorporation/checklist/branch-non-financial-services-20231228.pdf",
    "https://www.adgm.com/documents/registration-authority/registration-and-incorporation/checklist/private-company-limited-by-guarantee-non-financial-services-20231228.pdf",
    // Data protection (PDF)
    "https://www.adgm.com/documents/office-of-data-protection/templates/adgm-dpr-2021-appropriate-policy-document.pdf",
    // Templates (DOCX)
    "https://assets.adgm.com/download/assets/ADGM+Standard+Employment+Contract+Template+-+ER+2024+(Feb+2025).docx/ee14b252edbe11efa63b12b3a30e5e3a",
    "https://assets.adgm.com/download/assets/ADGM+Standard+Employment+Contract+-+ER+2019+-+Short+Version+(May+2024).docx/33b57a92ecfe11ef97a536cc36767ef8",
    "https://assets.adgm.com/download/assets/Templates_SHReso_AmendmentArticles-v1-20220107.docx/97120d7c5af911efae4b1e183375c0b2?forcedownload=1",
    "https://assets.adgm.com/download/assets/adgm-ra-resolution-multiple-incorporate-shareholders-LTD-incorporation-v2.docx/186a12846c3911efa4e6c6223862cd87",
];

/// Pinned sentence embedding model
pub const MINILM_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Default dimension for the offline hashing embedder
pub const HASHING_DIM: usize = 384;

/// Embedding backend options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// MiniLM sentence transformer run locally through Candle
    MiniLm { model_id: String },
    /// Deterministic feature hashing, no model download (offline/testing)
    Hashing { dimension: usize },
}

impl EmbeddingBackend {
    pub fn minilm() -> Self {
        EmbeddingBackend::MiniLm {
            model_id: MINILM_MODEL_ID.to_string(),
        }
    }

    pub fn hashing() -> Self {
        EmbeddingBackend::Hashing {
            dimension: HASHING_DIM,
        }
    }
}

/// Reference corpus configuration
#[derive(Debug, Clone)]
pub struct CorpusConfig {
    /// Remote reference documents to keep cached locally
    pub reference_urls: Vec<String>,
    /// Local cache of reference files (manually placed files are picked up too)
    pub reference_dir: PathBuf,
    /// Directory holding the persisted vector index
    pub index_dir: PathBuf,
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
    /// Download attempts per reference before giving up
    pub fetch_attempts: u32,
    /// Delay before the first retry; doubled for each further retry
    pub fetch_backoff: Duration,
    /// Per-request timeout
    pub fetch_timeout: Duration,
    pub embedding: EmbeddingBackend,
}

impl CorpusConfig {
    /// Default configuration rooted at `data_dir`
    /// (`<data_dir>/reference` and `<data_dir>/index`)
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            reference_urls: REFERENCE_URLS.iter().map(|u| u.to_string()).collect(),
            reference_dir: data_dir.join("reference"),
            index_dir: data_dir.join("index"),
            chunk_size: 1200,
            chunk_overlap: 150,
            fetch_attempts: 3,
            fetch_backoff: Duration::from_millis(500),
            fetch_timeout: Duration::from_secs(60),
            embedding: EmbeddingBackend::minilm(),
        }
    }

    /// Configuration that never touches the network: no remote references
    /// and the hashing embedder.
    pub fn offline(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir)
            .with_reference_urls(Vec::new())
            .with_embedding(EmbeddingBackend::hashing())
    }

    pub fn with_reference_urls(mut self, urls: Vec<String>) -> Self {
        self.reference_urls = urls;
        self
    }

    pub fn with_embedding(mut self, embedding: EmbeddingBackend) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    pub fn with_fetch_policy(mut self, attempts: u32, backoff: Duration) -> Self {
        self.fetch_attempts = attempts;
        self.fetch_backoff = backoff;
        self
    }

    /// Load configuration from environment variables
    ///
    /// Expected variables:
    /// - REVIEW_DATA_DIR: Root for reference cache and index (default: "./data")
    /// - REVIEW_EMBEDDING_BACKEND: "minilm" (default) or "hashing"
    /// - REVIEW_FETCH_ATTEMPTS: Download attempts per reference (default: 3)
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("REVIEW_DATA_DIR").unwrap_or_else(|_| "./data".to_string());
        let mut config = Self::new(data_dir);

        let backend = std::env::var("REVIEW_EMBEDDING_BACKEND").unwrap_or_else(|_| "minilm".to_string());
        config.embedding = match backend.to_lowercase().as_str() {
            "minilm" => EmbeddingBackend::minilm(),
            "hashing" => EmbeddingBackend::hashing(),
            other => {
                return Err(CorpusError::Config(format!(
                    "Unknown embedding backend: {}",
                    other
                )))
            }
        };

        if let Ok(attempts) = std::env::var("REVIEW_FETCH_ATTEMPTS") {
            config.fetch_attempts = attempts.parse().map_err(|_| {
                CorpusError::Config(format!("Invalid REVIEW_FETCH_ATTEMPTS: {}", attempts))
            })?;
        }

        Ok(config)
    }

    /// Location of the persisted index file
    pub fn index_path(&self) -> PathBuf {
        self.index_dir.join(crate::storage::INDEX_FILE)
    }
}
