//! Trading journal for the financial assistant
//!
//! Free-text trade logs go through an LLM pre-check and extraction step,
//! are normalized into the base currency, enriched with risk metrics
//! (R-multiple, planned reward/risk, holding period) and stored in SQLite.
//!
//! ```no_run
//! # async fn demo(llm: std::sync::Arc<dyn fin_llm::LLMProvider>) -> fin_journal::Result<()> {
//! use fin_journal::{JournalStore, PipelineConfig, StaticFxSource, TradeLogPipeline};
//! use std::sync::Arc;
//!
//! let store = JournalStore::new("sqlite://journal.db").await?;
//! let fx = Arc::new(StaticFxSource::new().with_rate("EUR", "USD", 1.08));
//! let pipeline = TradeLogPipeline::new(llm, fx, store, PipelineConfig::new("claude-sonnet-4-5", "USD"))?;
//!
//! let entries = pipeline.process("Bought 50 MSFT at 410, stop 400, sold at 425").await?;
//! println!("stored {} trades", entries.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod fx;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod store;

pub use error::{JournalError, Result};
pub use fx::{FxRateSource, StaticFxSource, YahooFxSource, conversion_rate};
pub use metrics::{compute_metrics, normalize, validate};
pub use models::{
    ExtractedTrade, JournalEntry, JournalSummary, NormalizedTrade, Page, PrecheckVerdict,
    TradeDirection, TradeMetrics, TradeStatus,
};
pub use pipeline::{PipelineConfig, TradeLogPipeline};
pub use store::{JournalStore, NewEntry};
