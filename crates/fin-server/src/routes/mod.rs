//! HTTP route groups

pub mod content;
pub mod health;
pub mod journal;
pub mod reports;
pub mod stocks;

pub use content::content_routes;
pub use health::health_routes;
pub use journal::journal_routes;
pub use reports::report_routes;
pub use stocks::stock_routes;

use crate::AppError;
use std::str::FromStr;

/// Parse an optional query value, falling back to the type's default
pub(crate) fn parse_or_default<T>(raw: Option<&str>) -> Result<T, AppError>
where
    T: FromStr + Default,
    AppError: From<T::Err>,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => Ok(value.parse()?),
        None => Ok(T::default()),
    }
}
