//! Conversation-aware query refinement
//!
//! Nearest-neighbour search only sees the words of one query, so follow-ups
//! like "and after that?" retrieve poorly. The refiner asks an LLM to fold the
//! conversation log into a standalone question. It is best-effort: every
//! failure falls back to the query as typed.

use std::backtrace::Backtrace;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{with_timeout, Error, Result};
use crate::providers::llm::{GenerateRequest, GenerationParams, LlmProvider, ModelInfo};

use super::prompt::PromptBuilder;

/// Priority-ordered model resolution against the service's model listing
#[derive(Debug, Clone)]
pub struct ModelSelector {
    preferred: Vec<String>,
}

impl ModelSelector {
    pub fn new(preferred: Vec<String>) -> Self {
        Self { preferred }
    }

    /// Pick a model from `models`
    ///
    /// Order: each preferred ID that is listed, then the first listed model
    /// that supports content generation. `None` if nothing qualifies.
    pub fn select(&self, models: &[ModelInfo]) -> Option<String> {
        self.preferred
            .iter()
            .find(|wanted| models.iter().any(|m| m.id() == wanted.as_str()))
            .cloned()
            .or_else(|| {
                models
                    .iter()
                    .find(|m| m.supports_generation())
                    .map(|m| m.id().to_string())
            })
    }

    /// List models from `llm` and select one
    pub async fn resolve(&self, llm: &dyn LlmProvider) -> Result<String> {
        let models = llm.list_models().await?;
        self.select(&models).ok_or(Error::NoCapableModel)
    }
}

/// LLM-backed query refiner
pub struct QueryRefiner {
    llm: Arc<dyn LlmProvider>,
    selector: ModelSelector,
    timeout: Duration,
}

impl QueryRefiner {
    pub fn new(llm: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self {
            llm,
            selector: ModelSelector::new(config.preferred_refine_models.clone()),
            timeout: config.timeout(),
        }
    }

    /// Refine `query`, reporting every failure
    pub async fn try_refine(&self, conversation: &str, query: &str) -> Result<String> {
        let model = with_timeout(
            "model listing",
            self.timeout,
            self.selector.resolve(self.llm.as_ref()),
        )
        .await?;

        let request = GenerateRequest::prompt(
            PromptBuilder::build_refine_prompt(conversation, query),
            GenerationParams::refinement(),
        );

        tracing::debug!("Refining query with model: {}", model);

        let refined = with_timeout(
            "query refinement",
            self.timeout,
            self.llm.generate(&model, &request),
        )
        .await?;

        let refined = refined.trim();
        if refined.is_empty() {
            return Err(Error::llm(format!("Model {} returned an empty refinement", model)));
        }
        Ok(refined.to_string())
    }

    /// Refine `query`, falling back to it unchanged on any failure
    pub async fn refine(&self, conversation: &str, query: &str) -> String {
        match self.try_refine(conversation, query).await {
            Ok(refined) => refined,
            Err(Error::NoCapableModel) => {
                tracing::warn!("No generation-capable model listed; using query as typed");
                query.to_string()
            }
            Err(e) => {
                tracing::warn!(
                    "Query refinement failed, using query as typed: {}\n{}",
                    e,
                    failure_detail(&e)
                );
                query.to_string()
            }
        }
    }
}

/// Debug form of `error` plus the backtrace at the point of recovery
///
/// The backtrace is only captured when `RUST_BACKTRACE` or
/// `RUST_LIB_BACKTRACE` enables it.
fn failure_detail(error: &Error) -> String {
    format!("{:?}\n{}", error, Backtrace::capture())
}
