//! In-memory vector index
//!
//! Brute-force cosine similarity over every stored vector. A stand-in for
//! the remote index when wiring a [`ChatSession`](crate::ChatSession) by hand
//! with [`ChatSession::with_providers`](crate::ChatSession::with_providers),
//! mainly in tests. Configuration always selects Pinecone.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::providers::vector_store::{IndexMatch, VectorIndexProvider};

struct Entry {
    id: String,
    vector: Vec<f32>,
    metadata: HashMap<String, serde_json::Value>,
}

/// In-memory index for tests and hand-wired sessions
pub struct InMemoryIndex {
    dimensions: usize,
    entries: RwLock<Vec<Entry>>,
}

impl InMemoryIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Insert (or replace) a vector carrying `text` in its metadata
    pub fn insert_text(&self, id: impl Into<String>, vector: Vec<f32>, text: &str) -> Result<()> {
        let mut metadata = HashMap::new();
        metadata.insert("text".to_string(), serde_json::Value::from(text));
        self.insert(id, vector, metadata)
    }

    /// Insert (or replace) a vector with arbitrary metadata
    pub fn insert(
        &self,
        id: impl Into<String>,
        vector: Vec<f32>,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::vector_db(format!(
                "Vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimensions
            )));
        }

        let id = id.into();
        let mut entries = self.entries.write();
        entries.retain(|e| e.id != id);
        entries.push(Entry {
            id,
            vector,
            metadata,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorIndexProvider for InMemoryIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<IndexMatch>> {
        if vector.len() != self.dimensions {
            return Err(Error::vector_db(format!(
                "Query has {} dimensions, index expects {}",
                vector.len(),
                self.dimensions
            )));
        }

        let entries = self.entries.read();
        let mut scored: Vec<(f32, &Entry)> = entries
            .iter()
            .map(|e| (cosine_similarity(vector, &e.vector), e))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, e)| IndexMatch {
                id: e.id.clone(),
                score,
                metadata: include_metadata.then(|| e.metadata.clone()),
            })
            .collect())
    }
}

/// Cosine similarity in [-1, 1]; zero vectors score 0
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = [1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &[0.0, 1.0, 0.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_query_orders_by_similarity() {
        let index = InMemoryIndex::new(3);
        index.insert_text("far", vec![0.0, 0.0, 1.0], "unrelated").unwrap();
        index.insert_text("near", vec![1.0, 0.1, 0.0], "refunds").unwrap();
        index.insert_text("mid", vec![0.6, 0.6, 0.0], "credit").unwrap();

        let matches = index.query(&[1.0, 0.0, 0.0], 2, true).await.unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "near");
        assert_eq!(matches[1].id, "mid");
        assert!(matches[0].score >= matches[1].score);
        assert_eq!(matches[0].text(), Some("refunds"));
    }

    #[tokio::test]
    async fn test_metadata_only_when_requested() {
        let index = InMemoryIndex::new(2);
        index.insert_text("a", vec![1.0, 0.0], "text").unwrap();

        let matches = index.query(&[1.0, 0.0], 1, false).await.unwrap();
        assert!(matches[0].metadata.is_none());
    }

    #[test]
    fn test_insert_replaces_and_checks_dimensions() {
        let index = InMemoryIndex::new(2);
        index.insert_text("a", vec![1.0, 0.0], "one").unwrap();
        index.insert_text("a", vec![0.0, 1.0], "two").unwrap();
        assert_eq!(index.len(), 1);

        assert!(index.insert_text("b", vec![1.0], "bad").is_err());
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let index = InMemoryIndex::new(2);
        assert!(index.is_empty());
        assert!(index.query(&[1.0, 0.0], 2, true).await.unwrap().is_empty());
    }
}
