//! Context-grounded answer generation

use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{with_timeout, Error, Result};
use crate::providers::llm::{ChatMessage, GenerateRequest, GenerationParams, LlmProvider};
use crate::types::Turn;

/// Composes system instruction, history, and the augmented user message into
/// one LLM call
pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self {
            llm,
            model: config.answer_model.clone(),
            temperature: config.answer_temperature,
            timeout: config.timeout(),
        }
    }

    /// Get the model being used
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Message list for one answer call: system, history in order, user
    pub fn build_request(
        &self,
        system_instruction: &str,
        history: &[Turn],
        user_message: &str,
    ) -> GenerateRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system_instruction));
        messages.extend(history.iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(user_message));

        GenerateRequest {
            messages,
            params: GenerationParams::with_temperature(self.temperature),
        }
    }

    /// Generate the answer; every failure is reported as [`Error::Generation`]
    pub async fn generate(
        &self,
        system_instruction: &str,
        history: &[Turn],
        user_message: &str,
    ) -> Result<String> {
        let request = self.build_request(system_instruction, history, user_message);

        tracing::info!(
            "Generating answer with model: {} ({} history turns)",
            self.model,
            history.len()
        );

        with_timeout(
            "answer generation",
            self.timeout,
            self.llm.generate(&self.model, &request),
        )
        .await
        .map_err(|e| match e {
            Error::Generation(_) => e,
            other => Error::generation(other.to_string()),
        })
    }
}
