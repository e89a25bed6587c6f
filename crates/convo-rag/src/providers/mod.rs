//! Provider abstractions for embeddings, LLM, and vector search
//!
//! Each remote service sits behind an `async_trait` so the pipeline can be
//! driven by the HTTP clients here or by test doubles.

pub mod embedding;
pub mod gemini;
pub mod llm;
pub mod local;
pub mod ollama;
pub mod pinecone;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use gemini::GeminiClient;
pub use llm::{ChatMessage, GenerateRequest, GenerationParams, LlmProvider, MessageRole, ModelInfo};
pub use local::InMemoryIndex;
pub use ollama::OllamaEmbedder;
pub use pinecone::PineconeIndex;
pub use vector_store::{IndexMatch, VectorIndexProvider};
