//! Factory for creating generation providers.

use std::sync::Arc;

use tracing::info;

use nudge_core::config::{GeneratorProvider, ProviderConfig};
use nudge_core::error::NudgeResult;
use nudge_core::traits::GenerationService;

use crate::anthropic::AnthropicGenerator;
use crate::ollama::OllamaGenerator;
use crate::openai::OpenAIGenerator;

/// Factory for creating generation providers.
pub struct GeneratorFactory;

impl GeneratorFactory {
    /// Create a provider from connection settings.
    pub fn from_config(config: &ProviderConfig) -> NudgeResult<Arc<dyn GenerationService>> {
        let generator: Arc<dyn GenerationService> = match config.provider {
            GeneratorProvider::OpenAI => Arc::new(OpenAIGenerator::new(config)?),
            GeneratorProvider::Anthropic => Arc::new(AnthropicGenerator::new(config)?),
            GeneratorProvider::Ollama => Arc::new(OllamaGenerator::new(config)?),
        };
        info!(provider = %config.provider, model = generator.model_name(), "Generator ready");
        Ok(generator)
    }

    /// Create a provider with its default model.
    pub fn create(provider: GeneratorProvider) -> NudgeResult<Arc<dyn GenerationService>> {
        Self::from_config(&ProviderConfig::new(provider))
    }

    /// Create a provider with a specific model.
    pub fn with_model(
        provider: GeneratorProvider,
        model: impl Into<String>,
    ) -> NudgeResult<Arc<dyn GenerationService>> {
        let config = ProviderConfig {
            model: model.into(),
            ..ProviderConfig::new(provider)
        };
        Self::from_config(&config)
    }

    /// Local Ollama with the default model.
    pub fn ollama() -> NudgeResult<Arc<dyn GenerationService>> {
        Self::create(GeneratorProvider::Ollama)
    }
}
