//! Alpha Vantage company overview client

use super::{CompanyInfo, Fundamentals};
use crate::error::{Result, StockError};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::instrument;

const BASE_URL: &str = "https://www.alphavantage.co/query";

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Alpha Vantage API client
#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
    base_url: String,
    rate_limiter: SharedRateLimiter,
}

/// Response of the OVERVIEW function
///
/// Alpha Vantage returns every value as a string and uses `"None"` or `"-"`
/// for missing numbers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompanyOverview {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    pub country: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    #[serde(rename = "MarketCapitalization")]
    pub market_cap: Option<String>,
    #[serde(rename = "PERatio")]
    pub pe_ratio: Option<String>,
    #[serde(rename = "EPS")]
    pub eps: Option<String>,
    pub dividend_yield: Option<String>,
    pub beta: Option<String>,
}

fn number(value: Option<&String>) -> Option<f64> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && *v != "None" && *v != "-")
        .and_then(|v| v.parse().ok())
}

fn text(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && *v != "None")
        .map(str::to_string)
}

impl CompanyOverview {
    /// Fundamental metrics contained in the overview
    pub fn fundamentals(&self) -> Fundamentals {
        Fundamentals {
            market_cap: number(self.market_cap.as_ref()),
            pe_ratio: number(self.pe_ratio.as_ref()),
            eps: number(self.eps.as_ref()),
            dividend_yield: number(self.dividend_yield.as_ref()),
            beta: number(self.beta.as_ref()),
            sector: text(self.sector.as_ref()),
            industry: text(self.industry.as_ref()),
        }
    }

    /// Fill gaps in `info` from the overview
    pub fn enrich(&self, info: &mut CompanyInfo) {
        info.name = info.name.take().or_else(|| text(self.name.as_ref()));
        info.exchange = info.exchange.take().or_else(|| text(self.exchange.as_ref()));
        info.currency = info.currency.take().or_else(|| text(self.currency.as_ref()));
        info.country = info.country.take().or_else(|| text(self.country.as_ref()));
        info.sector = info.sector.take().or_else(|| text(self.sector.as_ref()));
        info.industry = info.industry.take().or_else(|| text(self.industry.as_ref()));
        info.description = info
            .description
            .take()
            .or_else(|| text(self.description.as_ref()));
    }
}

impl AlphaVantageClient {
    /// Create a new Alpha Vantage client with API key and rate limit
    ///
    /// # Arguments
    /// * `api_key` - Alpha Vantage API key
    /// * `rate_limit` - Maximum requests per minute (5 on the free tier)
    pub fn new(api_key: impl Into<String>, rate_limit: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN));

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Point the client at a different endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Company overview (OVERVIEW function)
    #[instrument(skip(self))]
    pub async fn overview(&self, symbol: &str) -> Result<CompanyOverview> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "OVERVIEW"),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StockError::AlphaVantageError(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let data: serde_json::Value = response.json().await?;
        parse_overview(symbol, data)
    }
}

fn parse_overview(symbol: &str, data: serde_json::Value) -> Result<CompanyOverview> {
    if let Some(error) = data.get("Error Message") {
        return Err(StockError::AlphaVantageError(error.to_string()));
    }

    if data.get("Note").is_some() || data.get("Information").is_some() {
        return Err(StockError::RateLimitExceeded {
            provider: "Alpha Vantage".to_string(),
        });
    }

    let overview: CompanyOverview = serde_json::from_value(data)?;
    if overview.symbol.is_none() {
        return Err(StockError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: "no company overview".to_string(),
        });
    }
    Ok(overview)
}
