//! Yahoo Finance API client

use super::{AlphaVantageClient, Bar, CompanyInfo, Fundamentals, Interval, MarketDataSource, Quote, Range};
use crate::error::{Result, StockError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use yahoo_finance_api as yahoo;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Yahoo Finance client, optionally enriched with Alpha Vantage fundamentals
pub struct YahooClient {
    connector: yahoo::YahooConnector,
    rate_limiter: SharedRateLimiter,
    overview: Option<AlphaVantageClient>,
}

impl YahooClient {
    /// Create a client allowing `requests_per_second` calls
    pub fn new(requests_per_second: u32) -> Result<Self> {
        let connector =
            yahoo::YahooConnector::new().map_err(|e| StockError::YahooFinanceError(e.to_string()))?;
        let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            connector,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            overview: None,
        })
    }

    /// Use Alpha Vantage OVERVIEW data for fundamentals and company details
    pub fn with_overview(mut self, client: AlphaVantageClient) -> Self {
        self.overview = Some(client);
        self
    }

    fn to_utc(timestamp: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now)
    }
}

#[async_trait]
impl MarketDataSource for YahooClient {
    #[instrument(skip(self), fields(range = %range, interval = %interval))]
    async fn history(&self, symbol: &str, range: Range, interval: Interval) -> Result<Vec<Bar>> {
        self.rate_limiter.until_ready().await;

        let response = self
            .connector
            .get_quote_range(symbol, interval.as_str(), range.as_str())
            .await
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        let bars: Vec<Bar> = quotes
            .iter()
            .map(|q| Bar {
                timestamp: Self::to_utc(q.timestamp as i64),
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
                volume: q.volume,
            })
            .filter(|b| b.close.is_finite() && b.close > 0.0)
            .collect();

        debug!(bars = bars.len(), "Fetched history");

        if bars.is_empty() {
            return Err(StockError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("no bars for range {range}"),
            });
        }
        Ok(bars)
    }

    #[instrument(skip(self))]
    async fn quote(&self, symbol: &str) -> Result<Quote> {
        self.rate_limiter.until_ready().await;

        let response = self
            .connector
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        let quote = response
            .last_quote()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;
        let currency = response.metadata().ok().and_then(|m| m.currency.clone());

        Ok(Quote {
            symbol: symbol.to_string(),
            timestamp: Self::to_utc(quote.timestamp as i64),
            price: quote.close,
            volume: quote.volume,
            currency,
        })
    }

    #[instrument(skip(self))]
    async fn fundamentals(&self, symbol: &str) -> Result<Fundamentals> {
        match &self.overview {
            Some(client) => Ok(client.overview(symbol).await?.fundamentals()),
            None => {
                debug!("No fundamentals provider configured");
                Ok(Fundamentals::default())
            }
        }
    }

    #[instrument(skip(self))]
    async fn company_info(&self, symbol: &str) -> Result<CompanyInfo> {
        self.rate_limiter.until_ready().await;

        let response = self
            .connector
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;
        let meta = response
            .metadata()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        let mut info = CompanyInfo {
            symbol: symbol.to_string(),
            exchange: Some(meta.exchange_name.clone()),
            currency: meta.currency.clone(),
            ..CompanyInfo::default()
        };

        if let Some(client) = &self.overview {
            match client.overview(symbol).await {
                Ok(overview) => overview.enrich(&mut info),
                Err(e) => warn!(error = %e, "Company overview unavailable"),
            }
        }

        Ok(info)
    }
}
