use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Source metadata attached to units and chunks (`source`, `page`, `chunk`)
pub type Metadata = BTreeMap<String, String>;

pub const SOURCE_KEY: &str = "source";
pub const PAGE_KEY: &str = "page";
pub const CHUNK_KEY: &str = "chunk";

/// One parsed logical unit of a reference file: a PDF page or a whole DOCX
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceUnit {
    pub text: String,
    pub metadata: Metadata,
}

impl ReferenceUnit {
    pub fn new(text: String, source: &str) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(SOURCE_KEY.to_string(), source.to_string());
        Self { text, metadata }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.metadata.insert(PAGE_KEY.to_string(), page.to_string());
        self
    }
}

/// A retrievable window of reference text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceChunk {
    pub text: String,
    pub metadata: Metadata,
}
