//! OpenAI generation provider.

use async_trait::async_trait;

use nudge_core::config::ProviderConfig;
use nudge_core::error::{NudgeError, NudgeResult};
use nudge_core::traits::{GenerationRequest, GenerationResponse, GenerationService};

#[cfg(feature = "openai")]
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    },
    Client,
};
#[cfg(feature = "openai")]
use nudge_core::traits::TokenUsage;
#[cfg(feature = "openai")]
use nudge_core::types::{Message, MessageRole};
#[cfg(feature = "openai")]
use tracing::debug;

#[cfg(feature = "openai")]
use crate::messages::with_trailing_instruction;
#[cfg(feature = "openai")]
use crate::DEFAULT_MAX_TOKENS;

/// OpenAI generation provider. Also works with OpenAI-compatible servers
/// through `base_url`.
pub struct OpenAIGenerator {
    #[cfg(feature = "openai")]
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIGenerator {
    /// Create a new OpenAI provider.
    pub fn new(config: &ProviderConfig) -> NudgeResult<Self> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            NudgeError::Configuration(
                "OpenAI API key not found. Set OPENAI_API_KEY environment variable \
                 or provide api_key in config."
                    .to_string(),
            )
        })?;

        #[cfg(feature = "openai")]
        let openai_config = match config.base_url {
            Some(ref base_url) => OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(base_url),
            None => OpenAIConfig::new().with_api_key(api_key),
        };
        #[cfg(not(feature = "openai"))]
        let _ = api_key;

        Ok(Self {
            #[cfg(feature = "openai")]
            client: Client::with_config(openai_config),
            model: config.model_or_default().to_string(),
        })
    }

    /// Reasoning models reject sampling parameters.
    fn is_reasoning_model(model: &str) -> bool {
        let model = model.to_lowercase();
        ["o1", "o3", "o4", "gpt-5"]
            .iter()
            .any(|m| model.starts_with(m))
    }

    #[cfg(feature = "openai")]
    fn message_to_openai(msg: &Message) -> ChatCompletionRequestMessage {
        match msg.role {
            MessageRole::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            MessageRole::User => {
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            MessageRole::Assistant => {
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                        msg.content.clone(),
                    )),
                    ..Default::default()
                })
            }
        }
    }

    #[cfg(feature = "openai")]
    fn build_request(&self, request: &GenerationRequest) -> CreateChatCompletionRequest {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let messages = with_trailing_instruction(request)
            .iter()
            .map(Self::message_to_openai)
            .collect();

        let mut body = CreateChatCompletionRequest {
            model,
            messages,
            ..Default::default()
        };

        if !Self::is_reasoning_model(&body.model) {
            body.temperature = request.parameters.temperature;
            body.max_tokens = Some(request.parameters.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS));
        }
        body
    }
}

impl std::fmt::Debug for OpenAIGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIGenerator")
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl GenerationService for OpenAIGenerator {
    #[cfg(feature = "openai")]
    async fn generate(&self, request: GenerationRequest) -> NudgeResult<GenerationResponse> {
        let body = self.build_request(&request);
        debug!(model = %body.model, messages = body.messages.len(), "OpenAI request");

        let response = self
            .client
            .chat()
            .create(body)
            .await
            .map_err(|e| NudgeError::generation(format!("OpenAI API error: {}", e)))?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| NudgeError::invalid_response("No response choices returned"))?;

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(GenerationResponse {
            text: choice.message.content.clone().unwrap_or_default(),
            usage,
        })
    }

    #[cfg(not(feature = "openai"))]
    async fn generate(&self, _request: GenerationRequest) -> NudgeResult<GenerationResponse> {
        Err(NudgeError::Configuration(
            "OpenAI feature not enabled. Enable the 'openai' feature.".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(all(test, feature = "openai"))]
mod tests {
    use super::*;
    use chrono::Utc;
    use nudge_core::config::GeneratorProvider;

    fn generator(model: &str) -> OpenAIGenerator {
        let mut config = ProviderConfig::new(GeneratorProvider::OpenAI);
        config.api_key = Some("sk-test".to_string());
        config.model = model.to_string();
        OpenAIGenerator::new(&config).unwrap()
    }

    #[test]
    fn test_instruction_is_last_message() {
        let now = Utc::now();
        let request = GenerationRequest::new("nudge them", vec![Message::user("hey", now)]);
        let body = generator("").build_request(&request);

        assert_eq!(body.model, "gpt-4o-mini");
        assert_eq!(body.messages.len(), 2);
        assert!(matches!(
            body.messages.last(),
            Some(ChatCompletionRequestMessage::System(_))
        ));
        assert_eq!(body.max_tokens, Some(150));
    }

    #[test]
    fn test_reasoning_model_skips_sampling() {
        let request = GenerationRequest::new("nudge them", vec![]);
        let body = generator("o3-mini").build_request(&request);
        assert_eq!(body.max_tokens, None);
        assert_eq!(body.temperature, None);
    }

    #[test]
    fn test_conversation_model_overrides() {
        let mut request = GenerationRequest::new("nudge them", vec![]);
        request.model = Some("gpt-4.1".to_string());
        assert_eq!(generator("").build_request(&request).model, "gpt-4.1");
    }
}
