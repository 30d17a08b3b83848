//! Market data types and the provider seam

mod alpha_vantage;
mod yahoo;

pub use alpha_vantage::{AlphaVantageClient, CompanyOverview};
pub use yahoo::YahooClient;

use crate::error::{Result, StockError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Latest quote for a symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub volume: u64,
    pub currency: Option<String>,
}

/// Descriptive company data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub symbol: String,
    pub name: Option<String>,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    pub country: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
}

/// Fundamental metrics; every field is optional because coverage varies by
/// symbol and provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub eps: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub beta: Option<f64>,
    pub sector: Option<String>,
    pub industry: Option<String>,
}

/// Lookback window for historical data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Range {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[default]
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl Range {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::FiveDays => "5d",
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
            Self::YearToDate => "ytd",
            Self::Max => "max",
        }
    }
}

impl FromStr for Range {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "1d" => Self::OneDay,
            "5d" => Self::FiveDays,
            "1mo" => Self::OneMonth,
            "3mo" => Self::ThreeMonths,
            "6mo" => Self::SixMonths,
            "1y" => Self::OneYear,
            "2y" => Self::TwoYears,
            "5y" => Self::FiveYears,
            "ytd" => Self::YearToDate,
            "max" => Self::Max,
            other => return Err(StockError::InvalidParameter(format!("unknown range '{other}'"))),
        })
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bar size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[default]
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1wk")]
    OneWeek,
    #[serde(rename = "1mo")]
    OneMonth,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::OneHour => "1h",
            Self::OneDay => "1d",
            Self::OneWeek => "1wk",
            Self::OneMonth => "1mo",
        }
    }

    /// Nominal spacing between bars
    pub fn duration(&self) -> chrono::Duration {
        match self {
            Self::OneMinute => chrono::Duration::minutes(1),
            Self::FiveMinutes => chrono::Duration::minutes(5),
            Self::FifteenMinutes => chrono::Duration::minutes(15),
            Self::OneHour => chrono::Duration::hours(1),
            Self::OneDay => chrono::Duration::days(1),
            Self::OneWeek => chrono::Duration::weeks(1),
            Self::OneMonth => chrono::Duration::days(30),
        }
    }
}

impl FromStr for Interval {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "1m" => Self::OneMinute,
            "5m" => Self::FiveMinutes,
            "15m" => Self::FifteenMinutes,
            "1h" | "60m" => Self::OneHour,
            "1d" => Self::OneDay,
            "1wk" => Self::OneWeek,
            "1mo" => Self::OneMonth,
            other => {
                return Err(StockError::InvalidParameter(format!("unknown interval '{other}'")));
            }
        })
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper-case and validate a ticker symbol
///
/// Accepted characters are `A-Z 0-9 . ^ = -`, 1 to 15 of them.
pub fn normalize_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim().to_ascii_uppercase();
    let valid_char = |c: char| c.is_ascii_uppercase() || c.is_ascii_digit() || ".^=-".contains(c);

    if symbol.is_empty() || symbol.len() > 15 || !symbol.chars().all(valid_char) {
        return Err(StockError::InvalidSymbol(symbol));
    }
    Ok(symbol)
}

/// Source of prices and company data
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Historical bars, oldest first
    ///
    /// `Range` is path-qualified so the generated mock does not resolve it
    /// to `std::ops::Range`.
    async fn history(&self, symbol: &str, range: crate::data::Range, interval: Interval) -> Result<Vec<Bar>>;

    /// Most recent quote
    async fn quote(&self, symbol: &str) -> Result<Quote>;

    /// Fundamental metrics
    async fn fundamentals(&self, symbol: &str) -> Result<Fundamentals>;

    /// Descriptive company data
    async fn company_info(&self, symbol: &str) -> Result<CompanyInfo>;
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::Bar;
    use chrono::{Duration, TimeZone, Utc};

    /// Daily bars built from closes; open is the previous close
    pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let open = if i == 0 { close } else { closes[i - 1] };
                Bar {
                    timestamp: start + Duration::days(i as i64),
                    open,
                    high: open.max(close) + 1.0,
                    low: open.min(close) - 1.0,
                    close,
                    volume: 1_000 + (i as u64) * 10,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_parsing() {
        assert_eq!("1y".parse::<Range>().unwrap(), Range::OneYear);
        assert_eq!("YTD".parse::<Range>().unwrap(), Range::YearToDate);
        assert_eq!(Range::ThreeMonths.to_string(), "3mo");
        assert!(matches!("2w".parse::<Range>(), Err(StockError::InvalidParameter(_))));
    }

    #[test]
    fn test_interval_parsing() {
        assert_eq!("1wk".parse::<Interval>().unwrap(), Interval::OneWeek);
        assert_eq!("60m".parse::<Interval>().unwrap(), Interval::OneHour);
        assert!("3d".parse::<Interval>().is_err());
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_symbol("brk-b").unwrap(), "BRK-B");
        assert_eq!(normalize_symbol("^gspc").unwrap(), "^GSPC");
        assert_eq!(normalize_symbol("eurusd=x").unwrap(), "EURUSD=X");
        assert!(normalize_symbol("").is_err());
        assert!(normalize_symbol("AAPL; DROP").is_err());
        assert!(normalize_symbol("ABCDEFGHIJKLMNOP").is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Range::OneMonth).unwrap(), "\"1mo\"");
        let interval: Interval = serde_json::from_str("\"15m\"").unwrap();
        assert_eq!(interval, Interval::FifteenMinutes);
    }
}
