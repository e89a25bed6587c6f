//! convo-rag: Conversational retrieval-augmented chat
//!
//! Each user query runs through one pipeline:
//!
//! ```text
//! query ─► QueryRefiner ──► Retriever ──────────► AnswerGenerator ─► answer
//!            ▲  (Gemini)     (Ollama + Pinecone)     ▲  (Gemini)        │
//!            │                                       │                  │
//!            └──── plain-text log ─ ConversationMemory ─ recent turns ◄─┘
//! ```
//!
//! Refinement and retrieval are best-effort and degrade to the raw query and
//! a placeholder context. Only answer generation can fail a turn, and a failed
//! turn leaves memory untouched. See [`session::ChatSession`].

pub mod config;
pub mod error;
pub mod generation;
pub mod memory;
pub mod providers;
pub mod retrieval;
pub mod session;
pub mod types;

pub use config::ChatConfig;
pub use error::{Error, Result};
pub use memory::ConversationMemory;
pub use session::{ChatSession, SessionState, TurnOutcome};
pub use types::{ContextStatus, RetrievedContext, Role, TranscriptEntry, Turn};
