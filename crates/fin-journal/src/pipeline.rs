//! Free text to stored journal entries

use crate::fx::FxRateSource;
use crate::metrics::{compute_metrics, normalize, validate};
use crate::models::{ExtractedTrade, ExtractionResult, JournalEntry, PrecheckVerdict};
use crate::prompts;
use crate::store::{JournalStore, NewEntry};
use crate::{JournalError, Result};
use chrono::Utc;
use fin_llm::{CompletionRequest, LLMProvider, Message, complete_json};
use fin_prompt::PromptRegistry;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub model: String,
    pub base_currency: String,
    pub max_tokens: usize,
    pub temperature: f32,
    /// Longer input is truncated before it reaches the model
    pub max_input_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5".to_string(),
            base_currency: "USD".to_string(),
            max_tokens: 2048,
            temperature: 0.0,
            max_input_chars: 20_000,
        }
    }
}

impl PipelineConfig {
    pub fn new(model: impl Into<String>, base_currency: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            base_currency: base_currency.into().to_ascii_uppercase(),
            ..Self::default()
        }
    }
}

/// Pre-check, extraction, normalization, metrics and persistence
pub struct TradeLogPipeline {
    llm: Arc<dyn LLMProvider>,
    prompts: PromptRegistry,
    fx: Arc<dyn FxRateSource>,
    store: JournalStore,
    config: PipelineConfig,
}

impl TradeLogPipeline {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        fx: Arc<dyn FxRateSource>,
        store: JournalStore,
        config: PipelineConfig,
    ) -> Result<Self> {
        let prompts = PromptRegistry::new();
        prompts::register(&prompts)?;
        Ok(Self {
            llm,
            prompts,
            fx,
            store,
            config,
        })
    }

    pub fn store(&self) -> &JournalStore {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn prepare<'a>(&self, raw: &'a str) -> Result<&'a str> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(JournalError::EmptyInput);
        }
        Ok(match text.char_indices().nth(self.config.max_input_chars) {
            Some((cut, _)) => &text[..cut],
            None => text,
        })
    }

    fn request(&self, system: String, user: String) -> CompletionRequest {
        CompletionRequest::builder(&self.config.model)
            .system(system)
            .add_message(Message::user(user))
            .max_tokens(self.config.max_tokens)
            .temperature(self.config.temperature)
            .json_mode(true)
            .build()
    }

    /// Ask the model whether `raw` is a trading log at all
    #[instrument(skip(self, raw), fields(len = raw.len()))]
    pub async fn precheck(&self, raw: &str) -> Result<PrecheckVerdict> {
        let text = self.prepare(raw)?;
        let system = self.prompts.render(prompts::PRECHECK_SYSTEM, &json!({}))?;
        let user = self.prompts.render(prompts::PRECHECK_USER, &json!({ "text": text }))?;

        let verdict: PrecheckVerdict = complete_json(self.llm.as_ref(), self.request(system, user)).await?;
        debug!(is_trade_log = verdict.is_trade_log, reason = %verdict.reason, "Pre-check verdict");

        if !verdict.is_trade_log {
            let reason = if verdict.reason.is_empty() {
                "text does not describe any trade".to_string()
            } else {
                verdict.reason
            };
            return Err(JournalError::NotATradeLog(reason));
        }
        Ok(verdict)
    }

    /// Extract and validate the trades described in `raw`
    #[instrument(skip(self, raw), fields(len = raw.len()))]
    pub async fn extract(&self, raw: &str) -> Result<Vec<ExtractedTrade>> {
        let text = self.prepare(raw)?;
        let system = self.prompts.render(
            prompts::EXTRACT_SYSTEM,
            &json!({
                "base_currency": self.config.base_currency,
                "today": Utc::now().date_naive().to_string(),
            }),
        )?;
        let user = self.prompts.render(prompts::EXTRACT_USER, &json!({ "text": text }))?;

        let result: ExtractionResult = complete_json(self.llm.as_ref(), self.request(system, user)).await?;
        if result.trades.is_empty() {
            return Err(JournalError::NotATradeLog("no trades found in text".to_string()));
        }
        for trade in &result.trades {
            validate(trade)?;
        }
        debug!(count = result.trades.len(), "Extracted trades");
        Ok(result.trades)
    }

    /// Run the full chain and return the stored entries
    ///
    /// Entries of one log are stored together or not at all.
    #[instrument(skip(self, raw), fields(len = raw.len()))]
    pub async fn process(&self, raw: &str) -> Result<Vec<JournalEntry>> {
        self.precheck(raw).await?;
        let trades = self.extract(raw).await?;

        let mut entries = Vec::with_capacity(trades.len());
        for trade in &trades {
            let normalized = normalize(trade, &self.config.base_currency, self.fx.as_ref()).await?;
            let metrics = compute_metrics(&normalized);
            entries.push(NewEntry {
                trade: normalized,
                metrics,
                raw_text: raw.trim().to_string(),
            });
        }

        let ids = self.store.insert_all(&entries).await?;
        let mut stored = Vec::with_capacity(ids.len());
        for id in ids {
            stored.push(self.store.get(id).await?);
        }
        info!(count = stored.len(), "Trade log processed");
        Ok(stored)
    }
}
