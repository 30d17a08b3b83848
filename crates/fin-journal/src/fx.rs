//! Currency conversion rates

use crate::{JournalError, Result};
use async_trait::async_trait;
use fin_market::MarketDataSource;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Source of spot exchange rates
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FxRateSource: Send + Sync {
    /// Units of `to` per one unit of `from`
    async fn rate(&self, from: &str, to: &str) -> Result<f64>;
}

/// Rate lookup that short-circuits identical currencies and rejects
/// non-positive rates
pub async fn conversion_rate(fx: &dyn FxRateSource, from: &str, to: &str) -> Result<f64> {
    if from.eq_ignore_ascii_case(to) {
        return Ok(1.0);
    }
    let rate = fx.rate(from, to).await?;
    if !(rate.is_finite() && rate > 0.0) {
        return Err(JournalError::Fx {
            from: from.to_string(),
            to: to.to_string(),
            reason: format!("invalid rate {rate}"),
        });
    }
    Ok(rate)
}

/// Fixed table of rates; inverse pairs are derived
#[derive(Debug, Clone, Default)]
pub struct StaticFxSource {
    rates: HashMap<(String, String), f64>,
}

impl StaticFxSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, from: &str, to: &str, rate: f64) -> Self {
        self.rates
            .insert((from.to_ascii_uppercase(), to.to_ascii_uppercase()), rate);
        self
    }
}

#[async_trait]
impl FxRateSource for StaticFxSource {
    async fn rate(&self, from: &str, to: &str) -> Result<f64> {
        let (from, to) = (from.to_ascii_uppercase(), to.to_ascii_uppercase());
        if from == to {
            return Ok(1.0);
        }
        if let Some(rate) = self.rates.get(&(from.clone(), to.clone())) {
            return Ok(*rate);
        }
        if let Some(rate) = self.rates.get(&(to.clone(), from.clone())).filter(|r| **r != 0.0) {
            return Ok(1.0 / rate);
        }
        Err(JournalError::Fx {
            from,
            to,
            reason: "pair not configured".to_string(),
        })
    }
}

/// Rates from Yahoo currency tickers (`EURUSD=X`)
pub struct YahooFxSource {
    market: Arc<dyn MarketDataSource>,
}

impl YahooFxSource {
    pub fn new(market: Arc<dyn MarketDataSource>) -> Self {
        Self { market }
    }

    pub fn ticker(from: &str, to: &str) -> String {
        format!("{}{}=X", from.to_ascii_uppercase(), to.to_ascii_uppercase())
    }
}

#[async_trait]
impl FxRateSource for YahooFxSource {
    #[instrument(skip(self))]
    async fn rate(&self, from: &str, to: &str) -> Result<f64> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(1.0);
        }
        let ticker = Self::ticker(from, to);
        let quote = self.market.quote(&ticker).await.map_err(|e| JournalError::Fx {
            from: from.to_string(),
            to: to.to_string(),
            reason: e.to_string(),
        })?;
        debug!(%ticker, rate = quote.price, "FX rate");
        Ok(quote.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_rates_and_inverse() {
        let fx = StaticFxSource::new().with_rate("EUR", "USD", 1.25);
        assert_eq!(fx.rate("eur", "usd").await.unwrap(), 1.25);
        assert!((fx.rate("USD", "EUR").await.unwrap() - 0.8).abs() < 1e-12);
        assert_eq!(fx.rate("GBP", "GBP").await.unwrap(), 1.0);
        assert!(matches!(fx.rate("JPY", "USD").await, Err(JournalError::Fx { .. })));
    }

    #[tokio::test]
    async fn test_identity_skips_source() {
        // no expectations: any call would panic
        let fx = MockFxRateSource::new();
        assert_eq!(conversion_rate(&fx, "USD", "usd").await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_invalid_rate_rejected() {
        let mut fx = MockFxRateSource::new();
        fx.expect_rate().returning(|_, _| Ok(0.0));
        let result = conversion_rate(&fx, "EUR", "USD").await;
        assert!(matches!(result, Err(JournalError::Fx { .. })));
    }

    #[test]
    fn test_yahoo_ticker() {
        assert_eq!(YahooFxSource::ticker("eur", "usd"), "EURUSD=X");
    }
}
