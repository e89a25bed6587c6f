//! Semantic retrieval against the vector index

pub mod search;

pub use search::Retriever;
