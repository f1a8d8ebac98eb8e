//! nudge-llm - Text generation providers for nudge.
//!
//! Each provider implements [`GenerationService`]: it turns a
//! [`GenerationRequest`] (the automated-message instruction plus recent
//! conversation) into reply text.
//!
//! # Supported Providers
//!
//! - **OpenAI** (feature: `openai`) - GPT-4o, GPT-4.1, etc.
//! - **Anthropic** (feature: `anthropic`) - Claude 3.5 and later
//! - **Ollama** (feature: `ollama`) - Local models via Ollama
//!
//! # Example
//!
//! ```ignore
//! use nudge_llm::GeneratorFactory;
//!
//! let generator = GeneratorFactory::from_config(&config.provider)?;
//! let reply = generator.generate(request).await?;
//! ```

mod anthropic;
mod factory;
mod messages;
mod ollama;
mod openai;

pub use anthropic::AnthropicGenerator;
pub use factory::GeneratorFactory;
pub use ollama::OllamaGenerator;
pub use openai::OpenAIGenerator;

// Re-export core types for convenience
pub use nudge_core::config::{GeneratorProvider, ProviderConfig};
pub use nudge_core::traits::{GenerationRequest, GenerationResponse, GenerationService};

/// Reply length used when the request does not set one.
pub const DEFAULT_MAX_TOKENS: u32 = 150;
