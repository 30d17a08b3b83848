//! Configuration for market data access

use crate::data::{AlphaVantageClient, MarketDataSource, YahooClient};
use crate::error::{Result, StockError};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// TTL for historical bars and company info
    pub history_cache_ttl: Duration,

    /// TTL for assembled KPI reports
    pub kpi_cache_ttl: Duration,

    pub yahoo_requests_per_second: u32,

    /// Enables fundamentals and company details when set
    pub alpha_vantage_api_key: Option<String>,

    /// Free tier allows 5
    pub alpha_vantage_requests_per_minute: u32,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            history_cache_ttl: Duration::from_secs(300),
            kpi_cache_ttl: Duration::from_secs(300),
            yahoo_requests_per_second: 5,
            alpha_vantage_api_key: None,
            alpha_vantage_requests_per_minute: 5,
        }
    }
}

impl MarketConfig {
    pub fn with_kpi_cache_ttl(mut self, ttl: Duration) -> Self {
        self.kpi_cache_ttl = ttl;
        self
    }

    pub fn with_alpha_vantage_key(mut self, key: Option<String>) -> Self {
        self.alpha_vantage_api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.history_cache_ttl.is_zero() || self.kpi_cache_ttl.is_zero() {
            return Err(StockError::ConfigError("cache TTLs must be greater than 0".to_string()));
        }
        if self.yahoo_requests_per_second == 0 || self.alpha_vantage_requests_per_minute == 0 {
            return Err(StockError::ConfigError("rate limits must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// Build the configured data source
    pub fn build_source(&self) -> Result<Arc<dyn MarketDataSource>> {
        self.validate()?;
        let mut client = YahooClient::new(self.yahoo_requests_per_second)?;
        if let Some(key) = &self.alpha_vantage_api_key {
            info!("Alpha Vantage fundamentals enabled");
            client = client.with_overview(AlphaVantageClient::new(
                key.clone(),
                self.alpha_vantage_requests_per_minute,
            ));
        }
        Ok(Arc::new(client))
    }
}
