//! Error types for market data operations

use thiserror::Error;

/// Market data specific errors
#[derive(Debug, Error)]
pub enum StockError {
    /// Invalid stock symbol provided
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// A request parameter (range, interval, indicator, period) is invalid
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// Rate limit exceeded for API
    #[error("Rate limit exceeded for {provider}")]
    RateLimitExceeded { provider: String },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Alpha Vantage API error
    #[error("Alpha Vantage error: {0}")]
    AlphaVantageError(String),

    /// Technical indicator calculation error
    #[error("Technical indicator error: {0}")]
    IndicatorError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StockError {
    /// Whether the failure came from an upstream data provider
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded { .. }
                | Self::NetworkError(_)
                | Self::YahooFinanceError(_)
                | Self::AlphaVantageError(_)
        )
    }
}

/// Result type alias for market operations
pub type Result<T> = std::result::Result<T, StockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StockError::InvalidSymbol("BAD SYMBOL".to_string());
        assert_eq!(err.to_string(), "Invalid symbol: BAD SYMBOL");

        let err = StockError::DataUnavailable {
            symbol: "AAPL".to_string(),
            reason: "No data found".to_string(),
        };
        assert_eq!(err.to_string(), "Data not available for AAPL: No data found");
    }

    #[test]
    fn test_upstream_classification() {
        assert!(StockError::YahooFinanceError("x".into()).is_upstream());
        assert!(
            StockError::RateLimitExceeded {
                provider: "Alpha Vantage".into()
            }
            .is_upstream()
        );
        assert!(!StockError::InvalidParameter("range".into()).is_upstream());
    }
}
