//! On-disk persistence of the vector index
//!
//! The index is a single JSON file holding a manifest and every chunk with
//! its embedding. Writes go to a temporary sibling and are renamed into place
//! so a crash mid-save never leaves a half-written index behind.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::Metadata;
use crate::error::{CorpusError, Result};

/// Bumped whenever the persisted layout changes
pub const INDEX_SCHEMA_VERSION: u32 = 1;

pub const INDEX_FILE: &str = "index.json";

/// Identifies how an index was built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub schema_version: u32,
    pub model_id: String,
    pub dimension: usize,
    pub chunk_count: usize,
    pub built_at: DateTime<Utc>,
}

impl IndexManifest {
    pub fn new(model_id: &str, dimension: usize, chunk_count: usize) -> Self {
        Self {
            schema_version: INDEX_SCHEMA_VERSION,
            model_id: model_id.to_string(),
            dimension,
            chunk_count,
            built_at: Utc::now(),
        }
    }
}

/// One indexed chunk with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub text: String,
    pub metadata: Metadata,
    pub vector: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    manifest: IndexManifest,
    entries: Vec<StoredEntry>,
}

/// JSON index file at a fixed location
#[derive(Debug, Clone)]
pub struct IndexStorage {
    path: PathBuf,
}

impl IndexStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn save(&self, manifest: &IndexManifest, entries: &[StoredEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = IndexFile {
            manifest: manifest.clone(),
            entries: entries.to_vec(),
        };
        let json = serde_json::to_vec(&file)?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        tracing::debug!(
            path = %self.path.display(),
            chunks = manifest.chunk_count,
            "Index persisted"
        );
        Ok(())
    }

    /// Load and validate the persisted index.
    ///
    /// Fails with [`CorpusError::Index`] when the file is missing, unreadable,
    /// from another schema version, or internally inconsistent.
    pub fn load(&self) -> Result<(IndexManifest, Vec<StoredEntry>)> {
        if !self.exists() {
            return Err(CorpusError::Index(format!(
                "no index at {}",
                self.path.display()
            )));
        }

        let bytes = std::fs::read(&self.path)?;
        let file: IndexFile = serde_json::from_slice(&bytes)?;
        validate(&file.manifest, &file.entries)?;
        Ok((file.manifest, file.entries))
    }
}

fn validate(manifest: &IndexManifest, entries: &[StoredEntry]) -> Result<()> {
    if manifest.schema_version != INDEX_SCHEMA_VERSION {
        return Err(CorpusError::Index(format!(
            "schema version {} (expected {})",
            manifest.schema_version, INDEX_SCHEMA_VERSION
        )));
    }
    if manifest.chunk_count != entries.len() {
        return Err(CorpusError::Index(format!(
            "manifest lists {} chunks but {} are stored",
            manifest.chunk_count,
            entries.len()
        )));
    }
    if let Some(bad) = entries.iter().find(|e| e.vector.len() != manifest.dimension) {
        return Err(CorpusError::Index(format!(
            "vector of length {} in a {}-dimensional index",
            bad.vector.len(),
            manifest.dimension
        )));
    }
    Ok(())
}
