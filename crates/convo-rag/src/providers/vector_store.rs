//! Vector index provider trait for nearest-neighbour search

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::Result;

/// One neighbour returned by the index
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexMatch {
    /// Vector ID
    pub id: String,
    /// Similarity score (higher is more similar)
    #[serde(default)]
    pub score: f32,
    /// Metadata stored with the vector; carries at least `text`
    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl IndexMatch {
    /// The passage text stored under the `text` metadata key
    pub fn text(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("text"))
            .and_then(|v| v.as_str())
    }
}

/// Trait for nearest-neighbour search against a vector index
///
/// Implementations:
/// - `PineconeIndex`: Pinecone serverless/pod index over HTTP
/// - `InMemoryIndex`: brute-force cosine search for offline use and tests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorIndexProvider: Send + Sync {
    /// Return up to `top_k` neighbours of `vector`, most similar first
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<IndexMatch>>;
}
