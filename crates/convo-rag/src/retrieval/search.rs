//! Query embedding plus nearest-neighbour search
//!
//! `retrieve` is the typed operation; `find_context` is the degrading wrapper
//! the session uses, which always yields a non-empty context block.

use std::sync::Arc;
use std::time::Duration;

use crate::config::VectorDbConfig;
use crate::error::{with_timeout, Error, Result};
use crate::providers::{EmbeddingProvider, VectorIndexProvider};
use crate::types::{RetrievalMatch, RetrievedContext};

/// Retriever combining the embedding client and the vector index
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndexProvider>,
    /// Neighbours requested per query
    top_k: usize,
    /// Matches concatenated into the context block
    context_matches: usize,
    /// Deadline for the vector query
    timeout: Duration,
    /// Deadline for embedding, which may retry internally
    embed_timeout: Duration,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndexProvider>,
        config: &VectorDbConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            top_k: config.top_k,
            context_matches: config.context_matches,
            timeout: Duration::from_secs(config.timeout_secs),
            embed_timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Give embedding its own deadline, normally the embedder's full retry
    /// schedule (see [`EmbeddingConfig::retry_budget`])
    ///
    /// [`EmbeddingConfig::retry_budget`]: crate::config::EmbeddingConfig::retry_budget
    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    /// Embed `query` and return up to `top_k` matches, most relevant first
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalMatch>> {
        let vector = with_timeout(
            "embedding",
            self.embed_timeout,
            self.embedder.embed(query),
        )
        .await?;

        let neighbours = with_timeout(
            "vector query",
            self.timeout,
            self.index.query(&vector, top_k, true),
        )
        .await?;

        let mut matches = neighbours
            .into_iter()
            .map(|m| -> Result<RetrievalMatch> {
                let text = m
                    .text()
                    .ok_or_else(|| Error::vector_db(format!("Match '{}' has no text metadata", m.id)))?
                    .to_string();
                let mut metadata = m.metadata.unwrap_or_default();
                metadata.remove("text");
                Ok(RetrievalMatch {
                    text,
                    score: m.score,
                    metadata,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }

    /// Like [`retrieve`](Self::retrieve) but reports an empty result as
    /// [`Error::NoMatchFound`]
    pub async fn try_find_context(&self, query: &str) -> Result<RetrievedContext> {
        let matches = self.retrieve(query, self.top_k).await?;
        if matches.is_empty() {
            return Err(Error::NoMatchFound);
        }
        Ok(RetrievedContext::from_matches(&matches, self.context_matches))
    }

    /// Build the context block for `query`, degrading instead of failing
    ///
    /// No matches yields the no-match sentinel; any error yields a
    /// description of the failure.
    pub async fn find_context(&self, query: &str) -> RetrievedContext {
        match self.try_find_context(query).await {
            Ok(context) => context,
            Err(Error::NoMatchFound) => {
                tracing::info!("No matches for query: \"{}\"", query);
                RetrievedContext::no_match()
            }
            Err(e) => {
                tracing::warn!("Retrieval failed, continuing without context: {}", e);
                RetrievedContext::unavailable(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::embedding::MockEmbeddingProvider;
    use crate::providers::vector_store::{IndexMatch, MockVectorIndexProvider};
    use crate::types::ContextStatus;
    use std::collections::HashMap;

    fn text_match(id: &str, score: f32, text: &str) -> IndexMatch {
        let mut metadata = HashMap::new();
        metadata.insert("text".to_string(), serde_json::json!(text));
        metadata.insert("source".to_string(), serde_json::json!("faq.md"));
        IndexMatch {
            id: id.to_string(),
            score,
            metadata: Some(metadata),
        }
    }

    fn embedder_ok() -> MockEmbeddingProvider {
        let mut embedder = MockEmbeddingProvider::new();
        embedder.expect_embed().returning(|_| Ok(vec![0.1, 0.2, 0.3]));
        embedder
    }

    fn retriever(embedder: MockEmbeddingProvider, index: MockVectorIndexProvider) -> Retriever {
        Retriever::new(Arc::new(embedder), Arc::new(index), &VectorDbConfig::default())
    }

    #[tokio::test]
    async fn test_retrieve_sorts_and_requests_metadata() {
        let mut index = MockVectorIndexProvider::new();
        index
            .expect_query()
            .withf(|vector, top_k, include_metadata| {
                vector.len() == 3 && *top_k == 2 && *include_metadata
            })
            .returning(|_, _, _| {
                Ok(vec![
                    text_match("b", 0.4, "Store credit after 30 days."),
                    text_match("a", 0.9, "Refunds within 30 days."),
                ])
            });

        let matches = retriever(embedder_ok(), index)
            .retrieve("refund policy", 2)
            .await
            .unwrap();

        assert_eq!(matches[0].text, "Refunds within 30 days.");
        assert_eq!(matches[1].text, "Store credit after 30 days.");
        assert!(!matches[0].metadata.contains_key("text"));
        assert_eq!(matches[0].metadata["source"], "faq.md");
    }

    #[tokio::test]
    async fn test_find_context_joins_top_two() {
        let mut index = MockVectorIndexProvider::new();
        index.expect_query().returning(|_, _, _| {
            Ok(vec![
                text_match("a", 0.9, "Refunds within 30 days."),
                text_match("b", 0.8, "Store credit after 30 days."),
            ])
        });

        let context = retriever(embedder_ok(), index)
            .find_context("What is the refund policy?")
            .await;

        assert_eq!(
            context.text(),
            "Refunds within 30 days.\n\nStore credit after 30 days."
        );
    }

    #[tokio::test]
    async fn test_find_context_no_matches() {
        let mut index = MockVectorIndexProvider::new();
        index.expect_query().returning(|_, _, _| Ok(vec![]));

        let context = retriever(embedder_ok(), index).find_context("anything").await;

        assert_eq!(context.text(), "No relevant information found.");
        assert_eq!(context.status(), ContextStatus::NoMatch);
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades() {
        let mut embedder = MockEmbeddingProvider::new();
        embedder
            .expect_embed()
            .returning(|_| Err(Error::embedding("model not loaded")));
        let mut index = MockVectorIndexProvider::new();
        index.expect_query().never();

        let context = retriever(embedder, index).find_context("anything").await;

        assert_eq!(context.status(), ContextStatus::Unavailable);
        assert_eq!(
            context.text(),
            "Error retrieving context: Embedding generation failed: model not loaded"
        );
    }

    #[tokio::test]
    async fn test_index_failure_degrades() {
        let mut index = MockVectorIndexProvider::new();
        index
            .expect_query()
            .returning(|_, _, _| Err(Error::vector_db("503 Service Unavailable")));

        let context = retriever(embedder_ok(), index).find_context("anything").await;

        assert!(context.text().starts_with("Error retrieving context: "));
        assert!(context.text().contains("503"));
    }

    #[tokio::test]
    async fn test_match_without_text_is_an_error() {
        let mut index = MockVectorIndexProvider::new();
        index.expect_query().returning(|_, _, _| {
            Ok(vec![IndexMatch {
                id: "orphan".to_string(),
                score: 0.7,
                metadata: None,
            }])
        });

        let r = retriever(embedder_ok(), index);
        let err = r.retrieve("q", 2).await.unwrap_err();
        assert!(err.to_string().contains("orphan"));

        let context = r.find_context("q").await;
        assert_eq!(context.status(), ContextStatus::Unavailable);
    }

    /// Embedder that stalls before answering, like a hung first attempt
    /// followed by a successful retry
    struct StallingEmbedder(Duration);

    #[async_trait::async_trait]
    impl EmbeddingProvider for StallingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            tokio::time::sleep(self.0).await;
            Ok(vec![0.1, 0.2, 0.3])
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    fn one_second() -> VectorDbConfig {
        VectorDbConfig {
            timeout_secs: 1,
            ..VectorDbConfig::default()
        }
    }

    #[tokio::test]
    async fn test_slow_embedding_times_out_under_query_deadline() {
        let mut index = MockVectorIndexProvider::new();
        index.expect_query().never();
        let r = Retriever::new(
            Arc::new(StallingEmbedder(Duration::from_millis(1500))),
            Arc::new(index),
            &one_second(),
        );

        let context = r.find_context("refunds").await;
        assert_eq!(context.status(), ContextStatus::Unavailable);
        assert!(context.text().contains("embedding timed out"));
    }

    #[tokio::test]
    async fn test_embed_timeout_outlasts_query_deadline() {
        let mut index = MockVectorIndexProvider::new();
        index
            .expect_query()
            .returning(|_, _, _| Ok(vec![text_match("a", 0.9, "Refunds within 30 days.")]));
        let r = Retriever::new(
            Arc::new(StallingEmbedder(Duration::from_millis(1500))),
            Arc::new(index),
            &one_second(),
        )
        .with_embed_timeout(Duration::from_secs(3));

        let context = r.find_context("refunds").await;
        assert_eq!(context.text(), "Refunds within 30 days.");
    }
}
