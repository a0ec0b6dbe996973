//! Persisted vector index over the reference corpus
//!
//! The index is an explicitly constructed component: callers open (or build)
//! it once per run, pass it by reference to whatever needs citations, and
//! close it when done.

use std::path::Path;
use std::sync::Arc;

use crate::chunking::RecursiveSplitter;
use crate::config::CorpusConfig;
use crate::embeddings::Embedder;
use crate::error::{CorpusError, Result};
use crate::fetch::ensure_local_copies;
use crate::loader::{load_units, reference_files};
use crate::search::vector::top_k;
use crate::search::{RetrievedChunk, Retriever};
use crate::storage::{IndexManifest, IndexStorage, StoredEntry};

/// Query run against a freshly opened index to prove it is usable
pub const SMOKE_QUERY: &str = "ADGM";

const EMBED_BATCH_SIZE: usize = 64;

pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    storage: IndexStorage,
    manifest: IndexManifest,
    entries: Vec<StoredEntry>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("path", &self.storage.path())
            .field("manifest", &self.manifest)
            .finish()
    }
}

impl VectorIndex {
    /// Open the persisted index, rebuilding it when it is missing, corrupt,
    /// built by another model, or fails the smoke query.
    ///
    /// Only a rebuild failure is returned to the caller.
    pub async fn open_or_build(
        config: &CorpusConfig,
        embedder: Arc<dyn Embedder>,
        force_rebuild: bool,
    ) -> Result<Self> {
        if force_rebuild {
            tracing::info!("Forced rebuild of the reference index");
            return Self::build(config, embedder).await;
        }

        let opened = Self::open(config, embedder.clone())
            .and_then(|index| index.retrieve(SMOKE_QUERY, 1).map(|_| index));

        match opened {
            Ok(index) => {
                tracing::info!(
                    "Loaded reference index with {} chunks from {}",
                    index.len(),
                    index.path().display()
                );
                Ok(index)
            }
            Err(e) => {
                tracing::info!("Reference index unavailable ({}), rebuilding", e);
                Self::build(config, embedder).await
            }
        }
    }

    /// Open the persisted index without rebuilding.
    pub fn open(config: &CorpusConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let storage = IndexStorage::new(config.index_path());
        let (manifest, entries) = storage.load()?;

        if manifest.model_id != embedder.model_id() || manifest.dimension != embedder.dimension() {
            return Err(CorpusError::Index(format!(
                "built with {} ({} dims), configured embedder is {} ({} dims)",
                manifest.model_id,
                manifest.dimension,
                embedder.model_id(),
                embedder.dimension()
            )));
        }

        Ok(Self {
            embedder,
            storage,
            manifest,
            entries,
        })
    }

    /// Fetch, parse, chunk and embed the reference corpus, then persist it.
    pub async fn build(config: &CorpusConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let fetched = ensure_local_copies(config).await?;
        let files = reference_files(&config.reference_dir, &fetched)?;
        tracing::info!("Indexing {} reference file(s)", files.len());

        let units = tokio::task::spawn_blocking(move || load_units(&files))
            .await
            .map_err(|e| CorpusError::Index(format!("reference parsing task failed: {}", e)))?;

        let splitter = RecursiveSplitter::new(config.chunk_size, config.chunk_overlap);
        let chunks = splitter.split_units(&units);
        if chunks.is_empty() {
            return Err(CorpusError::EmptyCorpus {
                reference_dir: config.reference_dir.clone(),
            });
        }
        tracing::info!("Split {} unit(s) into {} chunks", units.len(), chunks.len());

        let worker = embedder.clone();
        let entries = tokio::task::spawn_blocking(move || -> Result<Vec<StoredEntry>> {
            let mut entries = Vec::with_capacity(chunks.len());
            for batch in chunks.chunks(EMBED_BATCH_SIZE) {
                let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
                let vectors = worker.embed_batch(&texts)?;
                for (chunk, vector) in batch.iter().zip(vectors) {
                    entries.push(StoredEntry {
                        text: chunk.text.clone(),
                        metadata: chunk.metadata.clone(),
                        vector,
                    });
                }
                tracing::debug!("Embedded {}/{} chunks", entries.len(), chunks.len());
            }
            Ok(entries)
        })
        .await
        .map_err(|e| CorpusError::Embedding(format!("embedding task failed: {}", e)))??;

        if let Some(bad) = entries.iter().find(|e| e.vector.len() != embedder.dimension()) {
            return Err(CorpusError::Embedding(format!(
                "embedder returned {} dims, expected {}",
                bad.vector.len(),
                embedder.dimension()
            )));
        }

        let manifest = IndexManifest::new(embedder.model_id(), embedder.dimension(), entries.len());
        let storage = IndexStorage::new(config.index_path());
        storage.save(&manifest, &entries)?;

        tracing::info!(
            "Built reference index: {} chunks, model {}, stored at {}",
            manifest.chunk_count,
            manifest.model_id,
            storage.path().display()
        );

        Ok(Self {
            embedder,
            storage,
            manifest,
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn path(&self) -> &Path {
        self.storage.path()
    }

    /// The `k` chunks most similar to `query`, most similar first.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query)?;
        let hits = top_k(
            &query_vector,
            self.entries.iter().map(|e| e.vector.as_slice()),
            k,
        );

        Ok(hits
            .into_iter()
            .map(|(i, score)| {
                let entry = &self.entries[i];
                RetrievedChunk {
                    text: entry.text.clone(),
                    metadata: entry.metadata.clone(),
                    score,
                }
            })
            .collect())
    }

    /// End of the index lifecycle. Everything is already persisted.
    pub fn close(self) {
        tracing::debug!("Closing reference index at {}", self.storage.path().display());
    }
}

impl Retriever for VectorIndex {
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        VectorIndex::retrieve(self, query, k)
    }
}
