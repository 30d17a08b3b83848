//! Error types for the trading journal

use thiserror::Error;

/// Result type for journal operations
pub type Result<T> = std::result::Result<T, JournalError>;

#[derive(Debug, Error)]
pub enum JournalError {
    /// Input text was empty or whitespace
    #[error("Trade log text is empty")]
    EmptyInput,

    /// The text is not a trading log
    #[error("Not a trade log: {0}")]
    NotATradeLog(String),

    /// An extracted or submitted record failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No exchange rate for a currency pair
    #[error("No FX rate {from}->{to}: {reason}")]
    Fx {
        from: String,
        to: String,
        reason: String,
    },

    /// Journal entry not found
    #[error("Journal entry {0} not found")]
    NotFound(i64),

    /// A stored row could not be decoded
    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),

    #[error(transparent)]
    Llm(#[from] fin_llm::LLMError),

    #[error(transparent)]
    Prompt(#[from] fin_prompt::PromptError),

    #[error(transparent)]
    Market(#[from] fin_market::StockError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl JournalError {
    pub(crate) fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }
}
