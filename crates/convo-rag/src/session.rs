//! Per-conversation orchestration
//!
//! One [`ChatSession`] owns its memory and runs the pipeline for each query:
//!
//! ```text
//! Idle -> Refining -> Retrieving -> Generating -> Updating -> Idle
//!             \            \             \
//!              +------------+-------------+--> Errored -> Idle
//! ```
//!
//! Refinement and retrieval degrade instead of failing, so in practice only
//! the answer call can route a turn through `Errored`. Memory is touched only
//! in `Updating`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::ChatConfig;
use crate::error::{Error, Result};
use crate::generation::prompt::{PromptBuilder, SYSTEM_INSTRUCTION};
use crate::generation::{AnswerGenerator, QueryRefiner};
use crate::memory::ConversationMemory;
use crate::providers::{
    EmbeddingProvider, GeminiClient, LlmProvider, OllamaEmbedder, PineconeIndex,
    VectorIndexProvider,
};
use crate::retrieval::Retriever;
use crate::types::RetrievedContext;

/// Pipeline stage of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Refining,
    Retrieving,
    Generating,
    Updating,
    Errored,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Refining => "refining",
            SessionState::Retrieving => "retrieving",
            SessionState::Generating => "generating",
            SessionState::Updating => "updating",
            SessionState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Result of one successful turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Query actually sent to retrieval (the input when refinement fell back)
    pub refined_query: String,
    /// Context block the answer was grounded on
    pub context: RetrievedContext,
    /// Model answer, also recorded in memory
    pub answer: String,
}

/// A single conversation with its own memory
pub struct ChatSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    state: SessionState,
    memory: ConversationMemory,
    refiner: QueryRefiner,
    retriever: Retriever,
    generator: AnswerGenerator,
}

impl ChatSession {
    pub fn new(
        refiner: QueryRefiner,
        retriever: Retriever,
        generator: AnswerGenerator,
        memory: ConversationMemory,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            state: SessionState::Idle,
            memory,
            refiner,
            retriever,
            generator,
        }
    }

    /// Wire a session from already-constructed providers
    ///
    /// The same LLM serves refinement and answering.
    pub fn with_providers(
        config: &ChatConfig,
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndexProvider>,
    ) -> Self {
        Self::new(
            QueryRefiner::new(llm.clone(), &config.llm),
            Retriever::new(embedder, index, &config.vector_db)
                .with_embed_timeout(config.embeddings.retry_budget()),
            AnswerGenerator::new(llm, &config.llm),
            ConversationMemory::new(
                config.session.greeting.clone(),
                config.session.max_history_turns,
            ),
        )
    }

    /// Validate `config` and connect Gemini, Ollama, and Pinecone
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        config.validate()?;

        let llm: Arc<dyn LlmProvider> = Arc::new(GeminiClient::new(&config.llm)?);
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(OllamaEmbedder::new(&config.embeddings)?);
        let index: Arc<dyn VectorIndexProvider> = Arc::new(PineconeIndex::new(&config.vector_db)?);

        let session = Self::with_providers(config, llm, embedder, index);
        tracing::info!(
            "Session {} ready (answer model: {}, index: {})",
            session.id,
            session.generator.model(),
            config.vector_db.index_name
        );
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Forget the conversation, keeping the greeting
    pub fn clear(&mut self) {
        self.memory.clear();
        tracing::info!("Session {} memory cleared", self.id);
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!("Session {}: {} -> {}", self.id, self.state, next);
        self.state = next;
    }

    /// Run one query through refine, retrieve, generate, and update
    ///
    /// On error the memory is left exactly as it was and the session is idle
    /// again, ready for the next query.
    pub async fn submit(&mut self, query: &str) -> Result<TurnOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }

        match self.run_pipeline(query).await {
            Ok(outcome) => {
                self.transition(SessionState::Idle);
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!("Turn failed in session {}: {}", self.id, e);
                self.transition(SessionState::Errored);
                self.transition(SessionState::Idle);
                Err(e)
            }
        }
    }

    async fn run_pipeline(&mut self, query: &str) -> Result<TurnOutcome> {
        self.transition(SessionState::Refining);
        let conversation = self.memory.as_plain_text();
        let refined_query = self.refiner.refine(&conversation, query).await;
        tracing::info!("Refined query: \"{}\"", refined_query);

        self.transition(SessionState::Retrieving);
        let context = self.retriever.find_context(&refined_query).await;
        tracing::debug!("Context status: {:?}", context.status());

        self.transition(SessionState::Generating);
        let message = PromptBuilder::build_augmented_message(context.text(), query);
        let history = self.memory.as_structured_history();
        let answer = self
            .generator
            .generate(SYSTEM_INSTRUCTION, &history, &message)
            .await?;

        self.transition(SessionState::Updating);
        self.memory.record(query, answer.clone());

        Ok(TurnOutcome {
            refined_query,
            context,
            answer,
        })
    }
}
