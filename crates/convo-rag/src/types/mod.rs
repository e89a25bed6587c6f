//! Core types for conversation turns and retrieval

pub mod retrieval;
pub mod turn;

pub use retrieval::{ContextStatus, RetrievalMatch, RetrievedContext};
pub use turn::{Role, TranscriptEntry, Turn};
