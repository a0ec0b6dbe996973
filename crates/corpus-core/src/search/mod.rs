//! Search module - similarity retrieval over the reference corpus
//!
//! This module provides:
//! - The `Retriever` seam the checks query for citations
//! - Cosine top-k ranking over stored vectors
//! - Confidence classification of hits for display

pub mod vector;

use serde::{Deserialize, Serialize};

use crate::document::{Metadata, SOURCE_KEY};
use crate::error::Result;

// Search confidence thresholds
pub const HIGH_CONFIDENCE_THRESHOLD: f32 = 0.85;
pub const LOW_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// A reference chunk returned for a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub metadata: Metadata,
    pub score: f32,
}

impl RetrievedChunk {
    /// Reference file the chunk came from, when known
    pub fn source(&self) -> Option<&str> {
        self.metadata
            .get(SOURCE_KEY)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn match_type(&self) -> MatchType {
        MatchType::from(self.score)
    }
}

/// Anything that can answer "the k most similar reference chunks".
///
/// Results come back most similar first, at most `k` of them.
pub trait Retriever: Send + Sync {
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>>;
}

/// Type of match based on similarity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    DirectMatch,  // score >= 0.85
    SimilarMatch, // 0.5 <= score < 0.85
    WeakMatch,    // score < 0.5
}

impl From<f32> for MatchType {
    fn from(score: f32) -> Self {
        if score >= HIGH_CONFIDENCE_THRESHOLD {
            MatchType::DirectMatch
        } else if score >= LOW_CONFIDENCE_THRESHOLD {
            MatchType::SimilarMatch
        } else {
            MatchType::WeakMatch
        }
    }
}
