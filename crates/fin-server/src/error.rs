//! Response envelope and HTTP error mapping

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fin_content::ContentError;
use fin_journal::JournalError;
use fin_market::StockError;
use fin_research::ResearchError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// Envelope for every JSON response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Well-formed request whose content cannot be processed
    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, error = %self, "Request failed");
        } else {
            warn!(%status, error = %self, "Request rejected");
        }
        (status, Json(ApiResponse::<()>::error(self.to_string()))).into_response()
    }
}

impl From<StockError> for AppError {
    fn from(e: StockError) -> Self {
        let message = e.to_string();
        match e {
            StockError::InvalidSymbol(_)
            | StockError::InvalidParameter(_)
            | StockError::IndicatorError(_) => Self::BadRequest(message),
            StockError::DataUnavailable { .. } => Self::NotFound(message),
            StockError::ConfigError(_) => Self::Internal(message),
            _ if e.is_upstream() => Self::Upstream(message),
            StockError::JsonError(_) => Self::Upstream(message),
            _ => Self::Internal(message),
        }
    }
}

impl From<JournalError> for AppError {
    fn from(e: JournalError) -> Self {
        let message = e.to_string();
        match e {
            JournalError::EmptyInput
            | JournalError::NotATradeLog(_)
            | JournalError::Validation(_) => Self::Unprocessable(message),
            JournalError::NotFound(_) => Self::NotFound(message),
            JournalError::Fx { .. } | JournalError::Llm(_) => Self::Upstream(message),
            JournalError::Market(inner) => inner.into(),
            JournalError::Prompt(_) | JournalError::Database(_) | JournalError::InvalidRecord(_) => {
                Self::Internal(message)
            }
        }
    }
}

impl From<ResearchError> for AppError {
    fn from(e: ResearchError) -> Self {
        let message = e.to_string();
        match e {
            ResearchError::EmptyTopic => Self::BadRequest(message),
            _ if e.is_upstream() => Self::Upstream(message),
            _ => Self::Internal(message),
        }
    }
}

impl From<ContentError> for AppError {
    fn from(e: ContentError) -> Self {
        let message = e.to_string();
        match e {
            ContentError::InvalidUrl { .. } | ContentError::InvalidParameter(_) => Self::BadRequest(message),
            _ if e.is_upstream() => Self::Upstream(message),
            _ => Self::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(AppError, StatusCode)> = vec![
            (JournalError::NotATradeLog("recipe".into()).into(), StatusCode::UNPROCESSABLE_ENTITY),
            (JournalError::Validation("quantity".into()).into(), StatusCode::UNPROCESSABLE_ENTITY),
            (JournalError::EmptyInput.into(), StatusCode::UNPROCESSABLE_ENTITY),
            (JournalError::NotFound(7).into(), StatusCode::NOT_FOUND),
            (StockError::InvalidParameter("range".into()).into(), StatusCode::BAD_REQUEST),
            (
                StockError::DataUnavailable {
                    symbol: "ZZZZ".into(),
                    reason: "no bars".into(),
                }
                .into(),
                StatusCode::NOT_FOUND,
            ),
            (
                StockError::RateLimitExceeded {
                    provider: "yahoo".into(),
                }
                .into(),
                StatusCode::BAD_GATEWAY,
            ),
            (JournalError::Market(StockError::YahooFinanceError("down".into())).into(), StatusCode::BAD_GATEWAY),
            (ResearchError::EmptyTopic.into(), StatusCode::BAD_REQUEST),
            (ResearchError::NoSections.into(), StatusCode::BAD_GATEWAY),
            (ResearchError::Graph("x".into()).into(), StatusCode::INTERNAL_SERVER_ERROR),
            (
                ContentError::InvalidUrl {
                    url: "ftp://x".into(),
                    reason: "scheme".into(),
                }
                .into(),
                StatusCode::BAD_REQUEST,
            ),
            (ContentError::EmptyPage("https://x".into()).into(), StatusCode::BAD_GATEWAY),
        ];
        for (error, expected) in cases {
            assert_eq!(error.status(), expected, "{error}");
        }
    }

    #[test]
    fn test_envelope_shape() {
        let ok = serde_json::to_value(ApiResponse::success(3)).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true, "data": 3, "error": null}));
        let err = serde_json::to_value(ApiResponse::<()>::error("nope")).unwrap();
        assert_eq!(err["success"], false);
        assert_eq!(err["error"], "nope");
    }
}
