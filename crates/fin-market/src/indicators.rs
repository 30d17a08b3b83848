//! Technical indicators
//!
//! Every series returned here is aligned index-for-index with its input.
//! Positions inside an indicator's warm-up window are `None`; they are never
//! filled with zeros or partial values. Ichimoku's leading spans are the one
//! exception to equal length: they are shifted forward and extend past the
//! last bar.

use crate::data::Bar;
use crate::error::{Result, StockError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ta::indicators::{
    AverageTrueRange, BollingerBands, ExponentialMovingAverage, FastStochastic, Maximum, Minimum,
    MovingAverageConvergenceDivergence, OnBalanceVolume, SimpleMovingAverage,
};
use ta::{DataItem, Next};

/// Indicator values aligned with the input; `None` during warm-up
pub type Series = Vec<Option<f64>>;

fn check_period(name: &str, period: usize) -> Result<()> {
    if period == 0 {
        return Err(StockError::InvalidParameter(format!("{name} period must be greater than 0")));
    }
    Ok(())
}

fn ta_err(e: impl fmt::Display) -> StockError {
    StockError::IndicatorError(e.to_string())
}

/// All-`None` series when the window is longer than the data
///
/// Checked before any `ta` indicator is built, since those allocate a
/// buffer of `period` entries up front.
fn too_short(len: usize, period: usize) -> Option<Series> {
    (period > len).then(|| vec![None; len])
}

/// Keep values from index `first` on; earlier ones become `None`
fn warm_up(values: impl IntoIterator<Item = f64>, first: usize) -> Series {
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| (i >= first).then_some(v))
        .collect()
}

/// Convert bars for `ta`, repairing highs/lows that do not bracket open and close
fn data_items(bars: &[Bar]) -> Result<Vec<DataItem>> {
    bars.iter()
        .map(|b| {
            DataItem::builder()
                .open(b.open)
                .high(b.high.max(b.open).max(b.close))
                .low(b.low.min(b.open).min(b.close))
                .close(b.close)
                .volume(b.volume as f64)
                .build()
                .map_err(ta_err)
        })
        .collect()
}

/// Simple moving average
pub fn sma(closes: &[f64], period: usize) -> Result<Series> {
    check_period("SMA", period)?;
    if let Some(empty) = too_short(closes.len(), period) {
        return Ok(empty);
    }
    let mut sma = SimpleMovingAverage::new(period).map_err(ta_err)?;
    Ok(warm_up(closes.iter().map(|&c| sma.next(c)), period - 1))
}

/// Exponential moving average
pub fn ema(closes: &[f64], period: usize) -> Result<Series> {
    check_period("EMA", period)?;
    if let Some(empty) = too_short(closes.len(), period) {
        return Ok(empty);
    }
    let mut ema = ExponentialMovingAverage::new(period).map_err(ta_err)?;
    Ok(warm_up(closes.iter().map(|&c| ema.next(c)), period - 1))
}

/// Relative strength index with Wilder smoothing
///
/// The first value appears at index `period`, once `period` price changes
/// are available.
pub fn rsi(closes: &[f64], period: usize) -> Result<Series> {
    check_period("RSI", period)?;
    let mut out = vec![None; closes.len()];
    if closes.len() <= period {
        return Ok(out);
    }

    let n = period as f64;
    let (mut avg_gain, mut avg_loss) = (0.0, 0.0);
    for w in closes[..=period].windows(2) {
        let change = w[1] - w[0];
        avg_gain += change.max(0.0) / n;
        avg_loss += (-change).max(0.0) / n;
    }

    let value = |gain: f64, loss: f64| {
        if loss == 0.0 {
            if gain == 0.0 { 50.0 } else { 100.0 }
        } else {
            100.0 - 100.0 / (1.0 + gain / loss)
        }
    };
    out[period] = Some(value(avg_gain, avg_loss));

    for i in period + 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        avg_gain = (avg_gain * (n - 1.0) + change.max(0.0)) / n;
        avg_loss = (avg_loss * (n - 1.0) + (-change).max(0.0)) / n;
        out[i] = Some(value(avg_gain, avg_loss));
    }
    Ok(out)
}

/// MACD line, signal line and histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdSeries {
    pub macd: Series,
    pub signal: Series,
    pub histogram: Series,
}

pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Result<MacdSeries> {
    check_period("MACD fast", fast)?;
    check_period("MACD slow", slow)?;
    check_period("MACD signal", signal)?;
    if fast >= slow {
        return Err(StockError::InvalidParameter(
            "MACD fast period must be shorter than slow period".to_string(),
        ));
    }

    if let Some(empty) = too_short(closes.len(), slow.max(signal)) {
        return Ok(MacdSeries {
            macd: empty.clone(),
            signal: empty.clone(),
            histogram: empty,
        });
    }

    let mut indicator = MovingAverageConvergenceDivergence::new(fast, slow, signal).map_err(ta_err)?;
    let outputs: Vec<_> = closes.iter().map(|&c| indicator.next(c)).collect();

    let line_start = slow - 1;
    let signal_start = slow + signal - 2;
    Ok(MacdSeries {
        macd: warm_up(outputs.iter().map(|o| o.macd), line_start),
        signal: warm_up(outputs.iter().map(|o| o.signal), signal_start),
        histogram: warm_up(outputs.iter().map(|o| o.histogram), signal_start),
    })
}

/// Bollinger bands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BollingerSeries {
    pub upper: Series,
    pub middle: Series,
    pub lower: Series,
}

pub fn bollinger(closes: &[f64], period: usize, k: f64) -> Result<BollingerSeries> {
    check_period("Bollinger", period)?;
    if !(k.is_finite() && k > 0.0) {
        return Err(StockError::InvalidParameter("Bollinger width must be positive".to_string()));
    }

    if let Some(empty) = too_short(closes.len(), period) {
        return Ok(BollingerSeries {
            upper: empty.clone(),
            middle: empty.clone(),
            lower: empty,
        });
    }

    let mut bands = BollingerBands::new(period, k).map_err(ta_err)?;
    let outputs: Vec<_> = closes.iter().map(|&c| bands.next(c)).collect();
    let first = period - 1;
    Ok(BollingerSeries {
        upper: warm_up(outputs.iter().map(|o| o.upper), first),
        middle: warm_up(outputs.iter().map(|o| o.average), first),
        lower: warm_up(outputs.iter().map(|o| o.lower), first),
    })
}

/// Average true range
pub fn atr(bars: &[Bar], period: usize) -> Result<Series> {
    check_period("ATR", period)?;
    if let Some(empty) = too_short(bars.len(), period) {
        return Ok(empty);
    }
    let mut atr = AverageTrueRange::new(period).map_err(ta_err)?;
    let items = data_items(bars)?;
    Ok(warm_up(items.iter().map(|item| atr.next(item)), period - 1))
}

/// Stochastic oscillator %K and %D
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StochasticSeries {
    pub k: Series,
    pub d: Series,
}

/// %K over `k_period` bars and %D as the `d_period` SMA of %K
pub fn stochastic(bars: &[Bar], k_period: usize, d_period: usize) -> Result<StochasticSeries> {
    check_period("Stochastic %K", k_period)?;
    check_period("Stochastic %D", d_period)?;
    if let Some(empty) = too_short(bars.len(), k_period) {
        return Ok(StochasticSeries {
            k: empty.clone(),
            d: empty,
        });
    }

    let mut fast = FastStochastic::new(k_period).map_err(ta_err)?;
    let items = data_items(bars)?;
    let k = warm_up(items.iter().map(|item| fast.next(item)), k_period - 1);

    if let Some(d) = too_short(bars.len(), d_period) {
        return Ok(StochasticSeries { k, d });
    }
    let mut smooth = SimpleMovingAverage::new(d_period).map_err(ta_err)?;
    let mut seen = 0usize;
    let d = k
        .iter()
        .map(|value| {
            value.and_then(|v| {
                seen += 1;
                let avg = smooth.next(v);
                (seen >= d_period).then_some(avg)
            })
        })
        .collect();

    Ok(StochasticSeries { k, d })
}

/// On-balance volume
pub fn obv(bars: &[Bar]) -> Result<Series> {
    let mut obv = OnBalanceVolume::new();
    let items = data_items(bars)?;
    Ok(items.iter().map(|item| Some(obv.next(item))).collect())
}

/// Cumulative volume-weighted average price using the typical price
///
/// Positions before the first traded volume are `None`.
pub fn vwap(bars: &[Bar]) -> Series {
    let mut pv = 0.0;
    let mut volume = 0.0;
    bars.iter()
        .map(|b| {
            pv += b.typical_price() * b.volume as f64;
            volume += b.volume as f64;
            (volume > 0.0).then(|| pv / volume)
        })
        .collect()
}

/// Ichimoku cloud components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IchimokuSeries {
    pub tenkan: Series,
    pub kijun: Series,
    /// Leading span A, `displacement` entries longer than the input
    pub senkou_a: Series,
    /// Leading span B, `displacement` entries longer than the input
    pub senkou_b: Series,
    /// Close shifted back by `displacement`
    pub chikou: Series,
    pub displacement: usize,
}

/// Midpoint of the highest high and lowest low over `period` bars
fn midpoint_channel(bars: &[Bar], period: usize) -> Result<Series> {
    if let Some(empty) = too_short(bars.len(), period) {
        return Ok(empty);
    }
    let mut highest = Maximum::new(period).map_err(ta_err)?;
    let mut lowest = Minimum::new(period).map_err(ta_err)?;
    Ok(warm_up(
        bars.iter()
            .map(|b| (highest.next(b.high) + lowest.next(b.low)) / 2.0),
        period - 1,
    ))
}

/// Ichimoku with conversion/base/span-B periods, displaced by `base`
pub fn ichimoku(bars: &[Bar], conversion: usize, base: usize, span_b: usize) -> Result<IchimokuSeries> {
    check_period("Ichimoku conversion", conversion)?;
    check_period("Ichimoku base", base)?;
    check_period("Ichimoku span B", span_b)?;

    let displacement = base;
    let tenkan = midpoint_channel(bars, conversion)?;
    let kijun = midpoint_channel(bars, base)?;
    let span_b_mid = midpoint_channel(bars, span_b)?;

    let total = bars.len() + displacement;
    let mut senkou_a = vec![None; total];
    let mut senkou_b = vec![None; total];
    for i in 0..bars.len() {
        senkou_a[i + displacement] = tenkan[i].zip(kijun[i]).map(|(t, k)| (t + k) / 2.0);
        senkou_b[i + displacement] = span_b_mid[i];
    }

    let chikou = (0..bars.len())
        .map(|i| bars.get(i + displacement).map(|b| b.close))
        .collect();

    Ok(IchimokuSeries {
        tenkan,
        kijun,
        senkou_a,
        senkou_b,
        chikou,
        displacement,
    })
}

/// An indicator requested by name, e.g. `SMA_20`, `RSI`, `BB`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndicatorKind {
    Sma { period: usize },
    Ema { period: usize },
    Rsi { period: usize },
    Macd { fast: usize, slow: usize, signal: usize },
    Bollinger { period: usize, k: f64 },
    Ichimoku,
    Stochastic { k: usize, d: usize },
    Atr { period: usize },
    Obv,
    Vwap,
}

impl IndicatorKind {
    /// Whether the indicator is drawn on the price panel
    pub fn is_overlay(&self) -> bool {
        matches!(
            self,
            Self::Sma { .. } | Self::Ema { .. } | Self::Bollinger { .. } | Self::Ichimoku | Self::Vwap
        )
    }

    /// Bars needed before the indicator produces a first value
    pub fn warm_up(&self) -> usize {
        match *self {
            Self::Sma { period } | Self::Ema { period } | Self::Atr { period } => period,
            Self::Rsi { period } => period.saturating_add(1),
            Self::Macd { slow, signal, .. } => slow.saturating_add(signal).saturating_sub(1),
            Self::Bollinger { period, .. } => period,
            Self::Ichimoku => 52,
            Self::Stochastic { k, d } => k.saturating_add(d).saturating_sub(1),
            Self::Obv | Self::Vwap => 1,
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sma { period } => write!(f, "SMA {period}"),
            Self::Ema { period } => write!(f, "EMA {period}"),
            Self::Rsi { period } => write!(f, "RSI {period}"),
            Self::Macd { fast, slow, signal } => write!(f, "MACD {fast},{slow},{signal}"),
            Self::Bollinger { period, k } => write!(f, "BB {period},{k}"),
            Self::Ichimoku => f.write_str("Ichimoku"),
            Self::Stochastic { k, d } => write!(f, "Stoch {k},{d}"),
            Self::Atr { period } => write!(f, "ATR {period}"),
            Self::Obv => f.write_str("OBV"),
            Self::Vwap => f.write_str("VWAP"),
        }
    }
}

impl FromStr for IndicatorKind {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        let (name, arg) = match upper.split_once('_') {
            Some((name, arg)) => (name, Some(arg)),
            None => (upper.as_str(), None),
        };

        let period = |default: usize| -> Result<usize> {
            match arg {
                None => Ok(default),
                Some(raw) => match raw.parse::<usize>() {
                    Ok(p) if p > 0 => Ok(p),
                    _ => Err(StockError::InvalidParameter(format!("invalid period in '{s}'"))),
                },
            }
        };

        Ok(match name {
            "SMA" => Self::Sma { period: period(20)? },
            "EMA" => Self::Ema { period: period(20)? },
            "RSI" => Self::Rsi { period: period(14)? },
            "MACD" => Self::Macd { fast: 12, slow: 26, signal: 9 },
            "BB" | "BOLLINGER" => Self::Bollinger { period: period(20)?, k: 2.0 },
            "ICHIMOKU" => Self::Ichimoku,
            "STOCH" | "STOCHASTIC" => Self::Stochastic { k: period(14)?, d: 3 },
            "ATR" => Self::Atr { period: period(14)? },
            "OBV" => Self::Obv,
            "VWAP" => Self::Vwap,
            _ => return Err(StockError::InvalidParameter(format!("unknown indicator '{s}'"))),
        })
    }
}

/// Parse a comma-separated indicator list, skipping empty items
pub fn parse_indicator_list(list: &str) -> Result<Vec<IndicatorKind>> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::parse)
        .collect()
}
