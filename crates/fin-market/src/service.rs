//! Cached access to bars, charts and company info

use crate::cache::{CacheKey, MarketCache};
use crate::chart::{Chart, ChartBuilder};
use crate::data::{Bar, CompanyInfo, Interval, MarketDataSource, Range, normalize_symbol};
use crate::error::Result;
use crate::indicators::IndicatorKind;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

#[derive(Clone)]
pub struct MarketService {
    source: Arc<dyn MarketDataSource>,
    cache: MarketCache,
}

impl MarketService {
    pub fn new(source: Arc<dyn MarketDataSource>, ttl: Duration) -> Self {
        Self {
            source,
            cache: MarketCache::new(ttl),
        }
    }

    pub fn source(&self) -> Arc<dyn MarketDataSource> {
        Arc::clone(&self.source)
    }

    /// Historical bars, cached per symbol/range/interval
    #[instrument(skip(self), fields(range = %range, interval = %interval))]
    pub async fn bars(&self, symbol: &str, range: Range, interval: Interval) -> Result<Vec<Bar>> {
        let symbol = normalize_symbol(symbol)?;
        let key = CacheKey::new(&symbol, "history", json!([range, interval]));
        self.cache
            .get_or_fetch(key, || self.source.history(&symbol, range, interval))
            .await
    }

    /// Chart with the requested indicators
    pub async fn chart(
        &self,
        symbol: &str,
        range: Range,
        interval: Interval,
        indicators: &[IndicatorKind],
    ) -> Result<Chart> {
        let symbol = normalize_symbol(symbol)?;
        let bars = self.bars(&symbol, range, interval).await?;
        ChartBuilder::new(symbol, bars)
            .with_all(indicators.iter().copied())
            .build()
    }

    #[instrument(skip(self))]
    pub async fn company_info(&self, symbol: &str) -> Result<CompanyInfo> {
        let symbol = normalize_symbol(symbol)?;
        let key = CacheKey::new(&symbol, "info", json!({}));
        self.cache
            .get_or_fetch(key, || self.source.company_info(&symbol))
            .await
    }
}
