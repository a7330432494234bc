//! Model backend contract.
//!
//! The transport lives outside the core; the gateway only needs "send this
//! prompt, give me the completion text" and a typed failure when that fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Model call failures. Messages never include prompt or completion text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Backend returned status {0}")]
    Status(u16),

    #[error("Model call exceeded deadline of {0:?}")]
    Timeout(Duration),

    #[error("Malformed completion: {0}")]
    MalformedResponse(String),
}

/// Client for the downstream model.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send the sanitized prompt and return the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Chat message in the OpenAI-compatible wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// `{model, messages}` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatCompletionRequest {
    /// Single-turn request carrying one user message.
    pub fn single_turn(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(prompt)],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// `choices[0].message.content`, or a typed failure when absent.
    pub fn into_first_content(self) -> Result<String, ModelError> {
        self.choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::MalformedResponse("no choices in completion".to_string()))?
            .message
            .and_then(|m| m.content)
            .ok_or_else(|| {
                ModelError::MalformedResponse("choices[0].message.content missing".to_string())
            })
    }
}
