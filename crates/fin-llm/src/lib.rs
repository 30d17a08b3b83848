//! LLM provider abstraction layer for the financial assistant
//!
//! This crate provides provider-agnostic abstractions for talking to Large
//! Language Models. It includes:
//!
//! - Message and completion request/response types
//! - The [`LLMProvider`] trait and concrete Anthropic / OpenAI providers
//! - A structured-output helper that turns a completion into a typed value

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod providers;
pub mod structured;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::LLMProvider;
pub use providers::build_provider;
pub use structured::{complete_json, extract_json_block};
