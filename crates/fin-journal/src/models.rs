//! Journal data types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum TradeDirection {
    Long,
    Short,
}

impl TradeDirection {
    /// +1 for long, -1 for short
    pub fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }
}

impl FromStr for TradeDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" | "buy" | "bought" => Ok(Self::Long),
            "short" | "sell" | "sold" | "sell short" => Ok(Self::Short),
            other => Err(format!("unknown trade direction '{other}'")),
        }
    }
}

impl TryFrom<String> for TradeDirection {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

impl TradeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl FromStr for TradeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown trade status '{other}'")),
        }
    }
}

/// One trade as returned by the extraction model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTrade {
    pub symbol: String,
    pub direction: TradeDirection,
    pub quantity: f64,
    pub entry_price: f64,
    #[serde(default)]
    pub exit_price: Option<f64>,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,
    #[serde(default)]
    pub fees: Option<f64>,
    /// Currency of the prices; the base currency when absent
    #[serde(default)]
    pub currency: Option<String>,
    /// PnL stated in the log, if any
    #[serde(default)]
    pub reported_pnl: Option<f64>,
    /// Currency of `reported_pnl`; the trade currency when absent
    #[serde(default)]
    pub pnl_currency: Option<String>,
    /// ISO date (YYYY-MM-DD)
    #[serde(default)]
    pub entry_date: Option<String>,
    #[serde(default)]
    pub exit_date: Option<String>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Extraction reply envelope
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ExtractionResult {
    #[serde(default)]
    pub trades: Vec<ExtractedTrade>,
}

/// Pre-check reply: is the text a trading log at all?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecheckVerdict {
    pub is_trade_log: bool,
    #[serde(default)]
    pub reason: String,
}

/// A trade with prices in the base currency and PnL resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTrade {
    pub symbol: String,
    pub direction: TradeDirection,
    pub status: TradeStatus,
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub fees: f64,
    /// Base currency all amounts are expressed in
    pub currency: String,
    /// Currency of the prices in the original log
    pub original_currency: String,
    /// Multiplier from `original_currency` to `currency`
    pub fx_rate: f64,
    pub pnl: Option<f64>,
    /// True when `pnl` came from the log rather than the prices
    pub pnl_reported: bool,
    pub entry_date: Option<NaiveDate>,
    pub exit_date: Option<NaiveDate>,
    pub strategy: Option<String>,
    pub notes: Option<String>,
}

/// Risk metrics derived from a normalized trade
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeMetrics {
    /// |entry - stop|
    pub risk_per_unit: Option<f64>,
    pub total_risk: Option<f64>,
    /// pnl / total_risk; only for stops on the protective side
    pub r_multiple: Option<f64>,
    /// |target - entry|
    pub planned_reward: Option<f64>,
    pub planned_rr: Option<f64>,
    /// pnl relative to entry notional, in percent
    pub return_pct: Option<f64>,
    pub holding_days: Option<i64>,
    /// `None` without a stop; `false` for a stop on the wrong side of entry
    pub stop_valid: Option<bool>,
}

/// A persisted journal row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: i64,
    #[serde(flatten)]
    pub trade: NormalizedTrade,
    #[serde(flatten)]
    pub metrics: TradeMetrics,
    pub raw_text: String,
    pub created_at: DateTime<Utc>,
}

/// A page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u32, page_size: u32, total: u64) -> Self {
        Self {
            items,
            page,
            page_size,
            total,
            total_pages: total.div_ceil(u64::from(page_size.max(1))),
        }
    }
}

/// Aggregate statistics over the journal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalSummary {
    pub trades: u64,
    pub open: u64,
    pub closed: u64,
    pub wins: u64,
    pub losses: u64,
    /// wins / closed trades with a PnL
    pub win_rate: Option<f64>,
    pub total_pnl: f64,
    pub profit_factor: Option<f64>,
    pub average_r: Option<f64>,
    /// P(win) * avg win R - P(loss) * avg loss R
    pub expectancy_r: Option<f64>,
}
