//! Concrete LLM provider implementations

pub mod anthropic;
pub mod openai;

#[cfg(any(test, feature = "testing"))]
pub mod scripted;

pub use anthropic::AnthropicProvider;
pub use openai::{OpenAIConfig, OpenAIProvider};

#[cfg(any(test, feature = "testing"))]
pub use scripted::ScriptedProvider;

use crate::{LLMProvider, Result};
use fin_utils::LlmProviderKind;
use std::sync::Arc;
use tracing::info;

/// Build the configured provider, reading credentials from the environment
pub fn build_provider(kind: LlmProviderKind) -> Result<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match kind {
        LlmProviderKind::Anthropic => Arc::new(AnthropicProvider::from_env()?),
        LlmProviderKind::OpenAI => Arc::new(OpenAIProvider::from_env()?),
    };
    info!(provider = provider.name(), "LLM provider ready");
    Ok(provider)
}
