//! Configuration for the chat pipeline
//!
//! Sources, later wins: built-in defaults, an optional TOML file, then
//! environment variables (`GOOGLE_API_KEY`, `PINECONE_API_KEY`,
//! `PINECONE_INDEX`, `OLLAMA_BASE_URL`).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatConfig {
    /// Gemini / LLM configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Vector index configuration
    #[serde(default)]
    pub vector_db: VectorDbConfig,
    /// Per-session behaviour
    #[serde(default)]
    pub session: SessionConfig,
}

/// LLM (Gemini) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key for the Generative Language API
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
    /// Model used for the final answer
    pub answer_model: String,
    /// Temperature for the final answer
    pub answer_temperature: f32,
    /// Refinement models in priority order
    pub preferred_refine_models: Vec<String>,
    /// Request timeout in seconds (per outbound call)
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            answer_model: "gemini-1.5-pro".to_string(),
            answer_temperature: 0.7,
            preferred_refine_models: vec!["gemini-1.5-pro".to_string(), "gemini-pro".to_string()],
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Embedding (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub model: String,
    /// Expected embedding dimensions
    pub dimensions: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            // all-MiniLM-L12-v2
            model: "all-minilm:33m".to_string(),
            dimensions: 384,
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

/// Vector index (Pinecone) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// API key for the vector service
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Control plane URL used to resolve the index host
    pub control_plane_url: String,
    /// Target index name
    pub index_name: String,
    /// Skip host resolution and query this host directly
    pub index_host: Option<String>,
    /// Number of neighbours requested from the index
    pub top_k: usize,
    /// Number of top matches concatenated into the context block
    pub context_matches: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl EmbeddingConfig {
    /// Worst-case wall time of one `embed` call: every attempt hitting the
    /// client timeout plus the backoff sleeps between attempts
    pub fn retry_budget(&self) -> Duration {
        let attempts = u64::from(self.max_retries) + 1;
        let backoff: Duration = (0..self.max_retries).map(retry_delay).sum();
        Duration::from_secs(self.timeout_secs * attempts) + backoff
    }
}

/// Sleep before retry `attempt` (0-based): 500ms, doubling each time
pub(crate) fn retry_delay(attempt: u32) -> Duration {
    Duration::from_millis(500 * 2u64.pow(attempt))
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            control_plane_url: "https://api.pinecone.io".to_string(),
            index_name: "pookie-chatbot".to_string(),
            index_host: None,
            top_k: 2,
            context_matches: 2,
            timeout_secs: 30,
        }
    }
}

/// Session behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum structured history turns passed to the answer model
    pub max_history_turns: usize,
    /// Seed greeting shown before the first query
    pub greeting: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history_turns: 10,
            greeting: "How can I assist you?".to_string(),
        }
    }
}

impl ChatConfig {
    /// Load from a TOML file; missing sections and fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&raw)?)
    }

    /// Defaults, then optional file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("GOOGLE_API_KEY").filter(|v| !v.is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(key) = lookup("PINECONE_API_KEY").filter(|v| !v.is_empty()) {
            self.vector_db.api_key = Some(key);
        }
        if let Some(index) = lookup("PINECONE_INDEX").filter(|v| !v.is_empty()) {
            self.vector_db.index_name = index;
        }
        if let Some(url) = lookup("OLLAMA_BASE_URL").filter(|v| !v.is_empty()) {
            self.embeddings.base_url = url;
        }
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.is_none() {
            return Err(Error::config(
                "Google API key not found. Please set GOOGLE_API_KEY.",
            ));
        }
        if self.vector_db.api_key.is_none() {
            return Err(Error::config(
                "Pinecone API key not found. Please set PINECONE_API_KEY.",
            ));
        }
        for (section, secs) in [
            ("llm", self.llm.timeout_secs),
            ("embeddings", self.embeddings.timeout_secs),
            ("vector_db", self.vector_db.timeout_secs),
        ] {
            if secs == 0 {
                return Err(Error::config(format!(
                    "{}.timeout_secs must be at least 1",
                    section
                )));
            }
        }
        if self.vector_db.top_k == 0 {
            return Err(Error::config("vector_db.top_k must be at least 1"));
        }
        if self.vector_db.context_matches == 0 {
            return Err(Error::config("vector_db.context_matches must be at least 1"));
        }
        if self.session.max_history_turns < 2 {
            return Err(Error::config(
                "session.max_history_turns must hold at least one exchange",
            ));
        }
        Ok(())
    }
}
