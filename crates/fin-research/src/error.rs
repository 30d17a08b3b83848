//! Error types for report generation

use thiserror::Error;

/// Result type for research operations
pub type Result<T> = std::result::Result<T, ResearchError>;

#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("Report topic is empty")]
    EmptyTopic,

    /// The planner produced no usable sections
    #[error("Report plan contained no sections")]
    NoSections,

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Web search failed: {0}")]
    Search(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error(transparent)]
    Llm(#[from] fin_llm::LLMError),

    #[error(transparent)]
    Prompt(#[from] fin_prompt::PromptError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ResearchError {
    /// Failure of an external service rather than of the request
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::NoSections | Self::Search(_) | Self::Llm(_) | Self::Http(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_classification() {
        assert!(ResearchError::Search("timeout".into()).is_upstream());
        assert!(ResearchError::NoSections.is_upstream());
        assert!(!ResearchError::EmptyTopic.is_upstream());
        assert!(!ResearchError::Configuration("depth".into()).is_upstream());
    }
}
