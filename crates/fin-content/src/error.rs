//! Error types for content services

use thiserror::Error;

/// Result type for content operations
pub type Result<T> = std::result::Result<T, ContentError>;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Non-success status from a fetched site or service
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Page yielded no text even after rendering
    #[error("No readable content at {0}")]
    EmptyPage(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Llm(#[from] fin_llm::LLMError),

    #[error(transparent)]
    Prompt(#[from] fin_prompt::PromptError),
}

impl ContentError {
    /// Failure of a remote site or service rather than of the request
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Status { .. } | Self::EmptyPage(_) | Self::Request(_) | Self::Llm(_)
        )
    }
}
