//! Corpus Core - Reference corpus and retrieval for submission review
//!
//! This crate provides:
//! - Reference corpus configuration
//! - Fetching and caching of reference documents
//! - PDF/DOCX parsing into logical text units
//! - Recursive chunking with overlap
//! - Embedding model integration (Candle) plus an offline hashing embedder
//! - A persisted vector index answering top-k queries

pub mod chunking;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod fetch;
pub mod index;
pub mod loader;
pub mod search;
pub mod storage;

// Re-export commonly used types
pub use chunking::RecursiveSplitter;
pub use config::{CorpusConfig, EmbeddingBackend, REFERENCE_URLS};
pub use document::{Metadata, ReferenceChunk, ReferenceUnit};
pub use embeddings::{load_embedder, Embedder, EmbeddingModel, HashingEmbedder};
pub use error::{CorpusError, Result};
pub use index::VectorIndex;
pub use search::{RetrievedChunk, Retriever};
