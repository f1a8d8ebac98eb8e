//! Ollama generation provider for local models.

use async_trait::async_trait;

use nudge_core::config::ProviderConfig;
use nudge_core::error::{NudgeError, NudgeResult};
use nudge_core::traits::{GenerationRequest, GenerationResponse, GenerationService};

#[cfg(feature = "ollama")]
use nudge_core::types::{Message, MessageRole};
#[cfg(feature = "ollama")]
use ollama_rs::{
    generation::chat::{ChatMessage, ChatMessageRequest, MessageRole as OllamaRole},
    generation::options::GenerationOptions,
    Ollama,
};
#[cfg(feature = "ollama")]
use tracing::debug;

#[cfg(feature = "ollama")]
use crate::messages::with_trailing_instruction;
#[cfg(feature = "ollama")]
use crate::DEFAULT_MAX_TOKENS;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_PORT: u16 = 11434;

/// Ollama generation provider.
pub struct OllamaGenerator {
    #[cfg(feature = "ollama")]
    client: Ollama,
    endpoint: String,
    model: String,
}

impl OllamaGenerator {
    /// Create a new Ollama provider. No API key is needed.
    pub fn new(config: &ProviderConfig) -> NudgeResult<Self> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        let url = url::Url::parse(&base_url)
            .map_err(|e| NudgeError::Configuration(format!("Invalid Ollama URL: {}", e)))?;

        let host = format!("{}://{}", url.scheme(), url.host_str().unwrap_or("localhost"));
        let port = url.port().unwrap_or(DEFAULT_OLLAMA_PORT);

        Ok(Self {
            #[cfg(feature = "ollama")]
            client: Ollama::new(host.clone(), port),
            endpoint: format!("{}:{}", host, port),
            model: config.model_or_default().to_string(),
        })
    }

    /// Host and port requests go to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[cfg(feature = "ollama")]
    fn message_to_ollama(msg: &Message) -> ChatMessage {
        ChatMessage {
            role: match msg.role {
                MessageRole::System => OllamaRole::System,
                MessageRole::User => OllamaRole::User,
                MessageRole::Assistant => OllamaRole::Assistant,
            },
            content: msg.content.clone(),
            images: None,
        }
    }
}

impl std::fmt::Debug for OllamaGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaGenerator")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl GenerationService for OllamaGenerator {
    #[cfg(feature = "ollama")]
    async fn generate(&self, request: GenerationRequest) -> NudgeResult<GenerationResponse> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let messages: Vec<ChatMessage> = with_trailing_instruction(&request)
            .iter()
            .map(Self::message_to_ollama)
            .collect();

        let max_tokens = request.parameters.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        let mut options = GenerationOptions::default().num_predict(max_tokens as i32);
        if let Some(temperature) = request.parameters.temperature {
            options = options.temperature(temperature);
        }

        debug!(model = %model, messages = messages.len(), "Ollama request");
        let chat = ChatMessageRequest::new(model, messages).options(options);

        let response = self
            .client
            .send_chat_messages(chat)
            .await
            .map_err(|e| NudgeError::generation(format!("Ollama API error: {}", e)))?;

        let text = response
            .message
            .map(|m| m.content)
            .ok_or_else(|| NudgeError::invalid_response("Ollama returned no message"))?;

        Ok(GenerationResponse::new(text))
    }

    #[cfg(not(feature = "ollama"))]
    async fn generate(&self, _request: GenerationRequest) -> NudgeResult<GenerationResponse> {
        Err(NudgeError::Configuration(
            "Ollama feature not enabled. Enable the 'ollama' feature.".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
