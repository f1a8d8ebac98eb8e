//! Generation provider selection.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Text generation provider type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum GeneratorProvider {
    #[default]
    OpenAI,
    Anthropic,
    Ollama,
}

impl GeneratorProvider {
    /// Model used when the configuration does not name one.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-4o-mini",
            Self::Anthropic => "claude-3-5-haiku-latest",
            Self::Ollama => "llama3.2",
        }
    }

    /// Environment variable holding this provider's API key, if it needs one.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Ollama => None,
        }
    }
}

/// Provider connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProviderConfig {
    pub provider: GeneratorProvider,
    /// Model name; empty means the provider default.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub model: String,
    /// API key (if not using environment variable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL for API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn new(provider: GeneratorProvider) -> Self {
        Self {
            provider,
            ..Default::default()
        }
    }

    /// The configured model or the provider default.
    pub fn model_or_default(&self) -> &str {
        if self.model.is_empty() {
            self.provider.default_model()
        } else {
            &self.model
        }
    }

    /// The configured key, falling back to the provider's environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            self.provider
                .api_key_env()
                .and_then(|var| std::env::var(var).ok())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!("anthropic".parse::<GeneratorProvider>().unwrap(), GeneratorProvider::Anthropic);
        assert_eq!("OpenAI".parse::<GeneratorProvider>().unwrap(), GeneratorProvider::OpenAI);
        assert!("gemini".parse::<GeneratorProvider>().is_err());
    }

    #[test]
    fn test_model_fallback() {
        let mut config = ProviderConfig::new(GeneratorProvider::Ollama);
        assert_eq!(config.model_or_default(), "llama3.2");
        config.model = "mistral".to_string();
        assert_eq!(config.model_or_default(), "mistral");
    }

    #[test]
    fn test_explicit_key_wins() {
        let mut config = ProviderConfig::new(GeneratorProvider::Ollama);
        assert_eq!(config.resolve_api_key(), None);
        config.api_key = Some("sk-test".to_string());
        assert_eq!(config.resolve_api_key().as_deref(), Some("sk-test"));
    }
}
