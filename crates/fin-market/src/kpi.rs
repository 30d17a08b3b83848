//! KPI aggregation
//!
//! Price, volume, volatility and fundamental metric groups are computed
//! independently; a group that cannot be produced is reported in
//! [`KpiReport::errors`] while the others are still returned.

use crate::cache::{CacheKey, MarketCache};
use crate::data::{Bar, Fundamentals, Interval, MarketDataSource, Range};
use crate::error::{Result, StockError};
use crate::indicators;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

const TRADING_DAYS: f64 = 252.0;
const VOLUME_AVERAGE_WINDOW: usize = 20;
const ATR_PERIOD: usize = 14;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceKpis {
    pub last: f64,
    pub change: Option<f64>,
    pub change_pct: Option<f64>,
    pub period_high: f64,
    pub period_low: f64,
    /// Distance of the last close below the period high, in percent (<= 0)
    pub from_high_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeKpis {
    pub last: u64,
    pub average_20: f64,
    pub relative: Option<f64>,
    /// Volume on up days over volume on down days
    pub up_down_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityKpis {
    pub daily_std: f64,
    pub annualized_std: f64,
    pub atr_14: Option<f64>,
    pub atr_pct: Option<f64>,
    /// Largest peak-to-trough decline of the period, in percent (>= 0)
    pub max_drawdown_pct: f64,
}

/// Aggregated KPIs for one symbol and range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiReport {
    pub symbol: String,
    pub range: Range,
    pub as_of: DateTime<Utc>,
    pub price: Option<PriceKpis>,
    pub volume: Option<VolumeKpis>,
    pub volatility: Option<VolatilityKpis>,
    pub fundamentals: Option<Fundamentals>,
    /// Group name to failure reason
    pub errors: BTreeMap<String, String>,
}

impl KpiReport {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

fn unavailable(reason: &str) -> StockError {
    StockError::DataUnavailable {
        symbol: String::new(),
        reason: reason.to_string(),
    }
}

pub fn price_kpis(bars: &[Bar]) -> Result<PriceKpis> {
    let last_bar = bars.last().ok_or_else(|| unavailable("no bars"))?;
    let last = last_bar.close;
    let previous = bars.len().checked_sub(2).map(|i| bars[i].close);

    let period_high = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let period_low = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);

    Ok(PriceKpis {
        last,
        change: previous.map(|p| last - p),
        change_pct: previous.filter(|p| *p != 0.0).map(|p| (last - p) / p * 100.0),
        period_high,
        period_low,
        from_high_pct: if period_high > 0.0 {
            (last - period_high) / period_high * 100.0
        } else {
            0.0
        },
    })
}

pub fn volume_kpis(bars: &[Bar]) -> Result<VolumeKpis> {
    let last = bars.last().ok_or_else(|| unavailable("no bars"))?.volume;

    let window = &bars[bars.len().saturating_sub(VOLUME_AVERAGE_WINDOW)..];
    let average_20 = window.iter().map(|b| b.volume as f64).sum::<f64>() / window.len() as f64;

    let (mut up, mut down) = (0.0, 0.0);
    for w in bars.windows(2) {
        if w[1].close > w[0].close {
            up += w[1].volume as f64;
        } else if w[1].close < w[0].close {
            down += w[1].volume as f64;
        }
    }

    Ok(VolumeKpis {
        last,
        average_20,
        relative: (average_20 > 0.0).then(|| last as f64 / average_20),
        up_down_ratio: (down > 0.0).then(|| up / down),
    })
}

pub fn volatility_kpis(bars: &[Bar]) -> Result<VolatilityKpis> {
    if bars.len() < 3 {
        return Err(unavailable("at least 3 bars are needed for volatility"));
    }

    let returns: Vec<f64> = bars
        .windows(2)
        .filter(|w| w[0].close > 0.0)
        .map(|w| w[1].close / w[0].close - 1.0)
        .collect();
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let daily_std = variance.sqrt();

    let atr_14 = indicators::atr(bars, ATR_PERIOD)?.last().copied().flatten();
    let last = bars[bars.len() - 1].close;

    let mut peak = f64::MIN;
    let mut max_drawdown = 0.0_f64;
    for close in bars.iter().map(|b| b.close) {
        peak = peak.max(close);
        if peak > 0.0 {
            max_drawdown = max_drawdown.max((peak - close) / peak);
        }
    }

    Ok(VolatilityKpis {
        daily_std,
        annualized_std: daily_std * TRADING_DAYS.sqrt(),
        atr_14,
        atr_pct: atr_14.filter(|_| last > 0.0).map(|atr| atr / last * 100.0),
        max_drawdown_pct: max_drawdown * 100.0,
    })
}

/// Fan-out/fan-in KPI aggregation with a TTL cache
pub struct KpiManager {
    source: Arc<dyn MarketDataSource>,
    cache: MarketCache,
}

impl KpiManager {
    pub fn new(source: Arc<dyn MarketDataSource>, ttl: Duration) -> Self {
        Self {
            source,
            cache: MarketCache::new(ttl),
        }
    }

    /// KPI report for `symbol` over `range`, served from cache when fresh
    ///
    /// Only an entirely failed report is an error; partial failures are
    /// listed in `errors`.
    #[instrument(skip(self), fields(range = %range))]
    pub async fn kpis(&self, symbol: &str, range: Range) -> Result<KpiReport> {
        let key = CacheKey::new(symbol, "kpis", range);
        self.cache
            .get_or_fetch(key, || self.compute(symbol, range))
            .await
    }

    async fn compute(&self, symbol: &str, range: Range) -> Result<KpiReport> {
        let (history, fundamentals) = tokio::join!(
            self.source.history(symbol, range, Interval::OneDay),
            self.source.fundamentals(symbol),
        );

        let mut errors = BTreeMap::new();
        let mut record = |group: &str, e: &StockError| {
            warn!(group, error = %e, "KPI group failed");
            errors.insert(group.to_string(), e.to_string());
        };

        let (price, volume, volatility) = match &history {
            Ok(bars) => {
                let (price, volume, volatility) =
                    (price_kpis(bars), volume_kpis(bars), volatility_kpis(bars));
                (
                    price.map_err(|e| record("price", &e)).ok(),
                    volume.map_err(|e| record("volume", &e)).ok(),
                    volatility.map_err(|e| record("volatility", &e)).ok(),
                )
            }
            Err(e) => {
                for group in ["price", "volume", "volatility"] {
                    record(group, e);
                }
                (None, None, None)
            }
        };
        let fundamentals = fundamentals.map_err(|e| record("fundamentals", &e)).ok();

        if price.is_none() && volume.is_none() && volatility.is_none() && fundamentals.is_none() {
            // Nothing worth caching or returning
            return Err(history.err().unwrap_or_else(|| unavailable("no KPI group succeeded")));
        }

        Ok(KpiReport {
            symbol: symbol.to_string(),
            range,
            as_of: Utc::now(),
            price,
            volume,
            volatility,
            fundamentals,
            errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MockMarketDataSource;
    use crate::data::fixtures::bars_from_closes;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_price_kpis() {
        let bars = bars_from_closes(&[100.0, 110.0, 105.0]);
        let kpis = price_kpis(&bars).unwrap();
        assert!(approx(kpis.last, 105.0));
        assert!(approx(kpis.change.unwrap(), -5.0));
        assert!(approx(kpis.change_pct.unwrap(), -5.0 / 110.0 * 100.0));
        assert!(approx(kpis.period_high, 111.0));
        assert!(kpis.from_high_pct < 0.0);
    }

    #[test]
    fn test_single_bar_has_no_change() {
        let kpis = price_kpis(&bars_from_closes(&[50.0])).unwrap();
        assert!(kpis.change.is_none());
        assert!(kpis.change_pct.is_none());
    }

    #[test]
    fn test_volume_kpis() {
        let mut bars = bars_from_closes(&[10.0, 11.0, 10.5, 12.0]);
        for (b, v) in bars.iter_mut().zip([100, 200, 100, 400]) {
            b.volume = v;
        }
        let kpis = volume_kpis(&bars).unwrap();
        assert_eq!(kpis.last, 400);
        assert!(approx(kpis.average_20, 200.0));
        assert!(approx(kpis.relative.unwrap(), 2.0));
        assert!(approx(kpis.up_down_ratio.unwrap(), 6.0));
    }

    #[test]
    fn test_volatility_kpis() {
        let bars = bars_from_closes(&[100.0, 120.0, 90.0, 95.0, 110.0]);
        let kpis = volatility_kpis(&bars).unwrap();
        assert!(kpis.daily_std > 0.0);
        assert!(approx(kpis.annualized_std, kpis.daily_std * 252f64.sqrt()));
        assert!(approx(kpis.max_drawdown_pct, 25.0));
        // fewer bars than the ATR period
        assert!(kpis.atr_14.is_none());

        assert!(volatility_kpis(&bars[..2]).is_err());
    }

    #[tokio::test]
    async fn test_partial_failure_degrades() {
        let mut source = MockMarketDataSource::new();
        source
            .expect_history()
            .returning(|_, _, _| Ok(bars_from_closes(&[10.0, 11.0, 12.0, 11.5])));
        source
            .expect_fundamentals()
            .returning(|_| Err(StockError::AlphaVantageError("down".into())));

        let manager = KpiManager::new(Arc::new(source), Duration::from_secs(60));
        let report = manager.kpis("AAPL", Range::OneMonth).await.unwrap();

        assert!(report.price.is_some());
        assert!(report.volatility.is_some());
        assert!(report.fundamentals.is_none());
        assert!(!report.is_complete());
        assert!(report.errors["fundamentals"].contains("down"));
    }

    #[tokio::test]
    async fn test_report_is_cached() {
        let mut source = MockMarketDataSource::new();
        source
            .expect_history()
            .times(1)
            .returning(|_, _, _| Ok(bars_from_closes(&[10.0, 11.0, 12.0])));
        source
            .expect_fundamentals()
            .times(1)
            .returning(|_| Ok(Fundamentals::default()));

        let manager = KpiManager::new(Arc::new(source), Duration::from_secs(60));
        let first = manager.kpis("AAPL", Range::OneMonth).await.unwrap();
        let second = manager.kpis("AAPL", Range::OneMonth).await.unwrap();
        assert_eq!(first.as_of, second.as_of);
        assert!(first.is_complete());
    }

    #[tokio::test]
    async fn test_total_failure_is_error() {
        let mut source = MockMarketDataSource::new();
        source
            .expect_history()
            .returning(|_, _, _| Err(StockError::YahooFinanceError("timeout".into())));
        source
            .expect_fundamentals()
            .returning(|_| Err(StockError::AlphaVantageError("down".into())));

        let manager = KpiManager::new(Arc::new(source), Duration::from_secs(60));
        let result = manager.kpis("AAPL", Range::OneMonth).await;
        assert!(matches!(result, Err(StockError::YahooFinanceError(_))));
    }
}
