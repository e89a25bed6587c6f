//! LLM provider trait and the request types shared by refinement and answering

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Role, Turn};

/// Generation method a model must list to be usable for text generation
pub const GENERATE_CONTENT: &str = "generateContent";

/// Role tag on an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A role-tagged message sent to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        let role = match turn.role() {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        };
        Self {
            role,
            content: turn.text().to_string(),
        }
    }
}

/// Sampling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub max_output_tokens: Option<u32>,
}

impl GenerationParams {
    /// Only a temperature, everything else left to the service
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature,
            top_p: None,
            top_k: None,
            max_output_tokens: None,
        }
    }

    /// Parameters used for query refinement
    pub fn refinement() -> Self {
        Self {
            temperature: 0.7,
            top_p: Some(1.0),
            top_k: Some(1),
            max_output_tokens: Some(256),
        }
    }
}

/// A complete generation call: ordered messages plus sampling parameters
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub messages: Vec<ChatMessage>,
    pub params: GenerationParams,
}

impl GenerateRequest {
    /// A single user prompt
    pub fn prompt(text: impl Into<String>, params: GenerationParams) -> Self {
        Self {
            messages: vec![ChatMessage::user(text)],
            params,
        }
    }

    /// Content of the final message, if any
    pub fn last_message(&self) -> Option<&str> {
        self.messages.last().map(|m| m.content.as_str())
    }
}

/// A model entry from the service's model listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Resource name, e.g. `models/gemini-1.5-pro`
    pub name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn new(name: impl Into<String>, methods: &[&str]) -> Self {
        Self {
            name: name.into(),
            supported_generation_methods: methods.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Model ID without the `models/` resource prefix
    pub fn id(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }

    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == GENERATE_CONTENT)
    }
}

/// Trait for LLM text generation
///
/// Implementations:
/// - `GeminiClient`: Google Generative Language API (gemini-1.5-pro, gemini-pro)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// List the models the service currently offers
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// Run one non-streaming generation call against `model`
    async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_id_strips_prefix() {
        let model = ModelInfo::new("models/gemini-pro", &[GENERATE_CONTENT]);
        assert_eq!(model.id(), "gemini-pro");

        let bare = ModelInfo::new("gemini-pro", &[]);
        assert_eq!(bare.id(), "gemini-pro");
    }

    #[test]
    fn test_supports_generation() {
        let embed_only = ModelInfo::new("models/embedding-001", &["embedContent"]);
        assert!(!embed_only.supports_generation());

        let chat = ModelInfo::new("models/gemini-pro", &["countTokens", GENERATE_CONTENT]);
        assert!(chat.supports_generation());
    }

    #[test]
    fn test_model_info_deserializes_listing_shape() {
        let model: ModelInfo = serde_json::from_str(
            r#"{"name":"models/gemini-1.5-pro","displayName":"Gemini 1.5 Pro","supportedGenerationMethods":["generateContent"]}"#,
        )
        .unwrap();
        assert_eq!(model.id(), "gemini-1.5-pro");
        assert!(model.supports_generation());
    }

    #[test]
    fn test_turn_into_message() {
        let msg = ChatMessage::from(&Turn::assistant("Hello"));
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.content, "Hello");
    }
}
