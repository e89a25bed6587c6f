//! Error types for the conversational RAG pipeline

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
///
/// Retrieval-side variants (`Embedding`, `VectorDb`, `NoMatchFound`) and the
/// refinement-side variants (`Llm`, `NoCapableModel`) are recovered locally by
/// the component that produces them. Only `Generation` ends a turn.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding service error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index error
    #[error("Vector database error: {0}")]
    VectorDb(String),

    /// The index returned no matches for the query
    #[error("No matching passages found")]
    NoMatchFound,

    /// LLM service error (model listing or refinement call)
    #[error("LLM error: {0}")]
    Llm(String),

    /// No listed model supports content generation
    #[error("No model supporting content generation is available")]
    NoCapableModel,

    /// Final answer generation failed
    #[error("Answer generation failed: {0}")]
    Generation(String),

    /// An outbound call exceeded its deadline
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    /// Empty or whitespace-only query
    #[error("Query is empty")]
    EmptyQuery,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML config parse error
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector db error
    pub fn vector_db(message: impl Into<String>) -> Self {
        Self::VectorDb(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }
}

/// Run an outbound call under a deadline, mapping expiry to [`Error::Timeout`]
pub async fn with_timeout<T, F>(operation: &'static str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            operation,
            secs: limit.as_secs(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::embedding("service down").to_string(),
            "Embedding generation failed: service down"
        );
        assert_eq!(
            Error::Timeout {
                operation: "vector query",
                secs: 5
            }
            .to_string(),
            "vector query timed out after 5s"
        );
        assert_eq!(Error::EmptyQuery.to_string(), "Query is empty");
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result: Result<()> = with_timeout("slow call", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(
            result,
            Err(Error::Timeout {
                operation: "slow call",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_with_timeout_passes_through() {
        let result = with_timeout("fast call", Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
