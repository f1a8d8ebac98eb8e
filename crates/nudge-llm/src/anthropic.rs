//! Anthropic (Claude) generation provider.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use nudge_core::config::ProviderConfig;
use nudge_core::error::{NudgeError, NudgeResult};
use nudge_core::traits::{GenerationRequest, GenerationResponse, GenerationService, TokenUsage};
use nudge_core::types::MessageRole;

use crate::messages::split_system;
use crate::DEFAULT_MAX_TOKENS;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic generation provider.
pub struct AnthropicGenerator {
    client: Client,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

impl AnthropicGenerator {
    /// Create a new Anthropic provider.
    pub fn new(config: &ProviderConfig) -> NudgeResult<Self> {
        let api_key: SecretString = config
            .resolve_api_key()
            .map(SecretString::new)
            .ok_or_else(|| {
                NudgeError::Configuration(
                    "Anthropic API key not found. Set ANTHROPIC_API_KEY environment variable \
                     or provide api_key in config."
                        .to_string(),
                )
            })?;

        let mut key = HeaderValue::from_str(api_key.expose_secret())
            .map_err(|_| NudgeError::configuration("Invalid API key format"))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| {
                NudgeError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| ANTHROPIC_API_URL.to_string());

        Ok(Self {
            client,
            model: config.model_or_default().to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_request(&self, request: &GenerationRequest) -> AnthropicRequest {
        let (system, turns) = split_system(request);
        AnthropicRequest {
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
            max_tokens: request.parameters.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.parameters.temperature,
            system,
            messages: turns
                .into_iter()
                .map(|(role, content)| AnthropicMessage {
                    role: match role {
                        MessageRole::Assistant => "assistant",
                        _ => "user",
                    },
                    content,
                })
                .collect(),
        }
    }
}

impl std::fmt::Debug for AnthropicGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicGenerator")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn parse_response(body: AnthropicResponse) -> GenerationResponse {
    let text = body
        .content
        .iter()
        .filter(|c| c.content_type == "text")
        .filter_map(|c| c.text.as_deref())
        .collect::<Vec<_>>()
        .join("");

    let usage = body.usage.map(|u| TokenUsage {
        prompt_tokens: u.input_tokens,
        completion_tokens: u.output_tokens,
        total_tokens: u.input_tokens + u.output_tokens,
    });

    GenerationResponse { text, usage }
}

#[async_trait]
impl GenerationService for AnthropicGenerator {
    async fn generate(&self, request: GenerationRequest) -> NudgeResult<GenerationResponse> {
        let body = self.build_request(&request);
        debug!(model = %body.model, turns = body.messages.len(), "Anthropic request");

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| NudgeError::api(format!("Anthropic request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(NudgeError::from_http_status(status.as_u16(), &message));
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| {
                NudgeError::invalid_response(format!("Failed to parse Anthropic response: {}", e))
            })?;

        Ok(parse_response(parsed))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nudge_core::config::GeneratorProvider;
    use nudge_core::types::Message;

    fn generator() -> AnthropicGenerator {
        let mut config = ProviderConfig::new(GeneratorProvider::Anthropic);
        config.api_key = Some("sk-ant-test".to_string());
        config.base_url = Some("http://localhost:9999/v1/".to_string());
        AnthropicGenerator::new(&config).unwrap()
    }

    #[test]
    fn test_new_uses_defaults() {
        let generator = generator();
        assert_eq!(generator.model_name(), "claude-3-5-haiku-latest");
        assert_eq!(generator.base_url, "http://localhost:9999/v1");
    }

    #[test]
    fn test_request_body() {
        let now = Utc::now();
        let mut request = GenerationRequest::new(
            "say something kind",
            vec![Message::user("rough day", now), Message::assistant("sorry to hear", now)],
        );
        request.parameters.temperature = Some(0.7);

        let body = serde_json::to_value(generator().build_request(&request)).unwrap();
        assert_eq!(body["max_tokens"], 150);
        assert_eq!(body["system"], "say something kind");
        assert_eq!(body["messages"].as_array().unwrap().len(), 3);
        assert_eq!(body["messages"][2]["role"], "user");
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_unreachable_endpoint_is_network_error() {
        let mut config = ProviderConfig::new(GeneratorProvider::Anthropic);
        config.api_key = Some("sk-ant-test".to_string());
        config.base_url = Some("http://127.0.0.1:9/v1".to_string());
        let generator = AnthropicGenerator::new(&config).unwrap();

        let request = GenerationRequest::new("hi", vec![Message::user("hello", Utc::now())]);
        let err = tokio_test::block_on(generator.generate(request)).unwrap_err();
        assert!(matches!(err, NudgeError::Network { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_parse_response_joins_text_blocks() {
        let body: AnthropicResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"Hello"},{"type":"text","text":" there"}],
                "usage":{"input_tokens":12,"output_tokens":3}}"#,
        )
        .unwrap();
        let response = parse_response(body);
        assert_eq!(response.text, "Hello there");
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }
}
