//! Text generation trait and related types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::NudgeResult;
use crate::types::Message;

/// A single generation call: the instruction plus conversation context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Instruction for this automated message.
    pub prompt: String,
    /// Conversation messages the reply should follow from.
    pub context: Vec<Message>,
    /// Model override; `None` uses the service's configured model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub parameters: GenerationParameters,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, context: Vec<Message>) -> Self {
        Self {
            prompt: prompt.into(),
            context,
            ..Default::default()
        }
    }
}

/// Sampling parameters for a generation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Provider-specific extras passed through untouched.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    pub completion_tokens: u32,
    /// Total tokens.
    pub total_tokens: u32,
}

/// Response from a generation call.
#[derive(Debug, Clone, Default)]
pub struct GenerationResponse {
    /// Generated text.
    pub text: String,
    /// Token usage statistics.
    pub usage: Option<TokenUsage>,
}

impl GenerationResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// Text generation service. All providers implement this.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generate the text of one automated message.
    async fn generate(&self, request: GenerationRequest) -> NudgeResult<GenerationResponse>;

    /// Get the model name.
    fn model_name(&self) -> &str;
}
