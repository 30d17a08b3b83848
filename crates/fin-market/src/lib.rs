//! Market data for the financial assistant
//!
//! - [`data`]: OHLCV types, the [`MarketDataSource`] seam and the Yahoo /
//!   Alpha Vantage clients
//! - [`indicators`]: SMA, EMA, RSI, MACD, Bollinger, ATR, stochastic, OBV,
//!   VWAP and Ichimoku series
//! - [`chart`]: multi-panel chart assembly with Plotly export
//! - [`kpi`]: concurrent KPI aggregation with a TTL cache
//! - [`hours`]: exchange sessions and holiday calendars

pub mod cache;
pub mod chart;
pub mod config;
pub mod data;
pub mod error;
pub mod hours;
pub mod indicators;
pub mod kpi;
pub mod service;

pub use cache::{CacheKey, MarketCache};
pub use chart::{Chart, ChartBuilder, Panel, PanelKind, Trace};
pub use config::MarketConfig;
pub use data::{
    AlphaVantageClient, Bar, CompanyInfo, Fundamentals, Interval, MarketDataSource, Quote, Range,
    YahooClient, normalize_symbol,
};
pub use error::{Result, StockError};
pub use hours::{Exchange, MarketStatus, Session, market_status};
pub use indicators::{IndicatorKind, parse_indicator_list};
pub use kpi::{KpiManager, KpiReport};
pub use service::MarketService;
