//! Shared application state

use anyhow::Context;
use fin_content::{HackerNewsClient, RelevanceScorer, Scraper, ScraperConfig};
use fin_journal::{JournalStore, PipelineConfig, TradeLogPipeline, YahooFxSource};
use fin_llm::build_provider;
use fin_market::{KpiManager, MarketConfig, MarketService};
use fin_research::{ReportConfig, ReportRunner, TavilyClient};
use fin_utils::AppConfig;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Searches per minute allowed against Tavily
const SEARCH_RATE_PER_MINUTE: u32 = 60;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub market: MarketService,
    pub kpis: Arc<KpiManager>,
    pub journal: Arc<TradeLogPipeline>,
    /// Absent when no search key is configured
    pub reports: Option<Arc<ReportRunner>>,
    pub scraper: Arc<Scraper>,
    pub hackernews: Arc<HackerNewsClient>,
    pub relevance: Arc<RelevanceScorer>,
}

impl AppState {
    /// Wire every service from configuration
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let llm = build_provider(config.llm_provider).context("building LLM provider")?;

        let market_config = MarketConfig::default()
            .with_kpi_cache_ttl(config.kpi_cache_ttl())
            .with_alpha_vantage_key(config.alpha_vantage_api_key.clone());
        let source = market_config.build_source().context("building market data source")?;
        let market = MarketService::new(Arc::clone(&source), market_config.history_cache_ttl);
        let kpis = Arc::new(KpiManager::new(Arc::clone(&source), market_config.kpi_cache_ttl));

        ensure_database_dir(&config.database_url)?;
        let store = JournalStore::new(&config.database_url)
            .await
            .with_context(|| format!("opening journal database {}", config.database_url))?;
        let journal = TradeLogPipeline::new(
            Arc::clone(&llm),
            Arc::new(YahooFxSource::new(source)),
            store,
            PipelineConfig::new(&config.llm_model, &config.base_currency),
        )?;

        let reports = match &config.tavily_api_key {
            Some(key) => {
                let search = Arc::new(TavilyClient::new(key.clone(), SEARCH_RATE_PER_MINUTE));
                let report_config = ReportConfig::default().with_model(&config.llm_model);
                Some(Arc::new(ReportRunner::new(Arc::clone(&llm), search, report_config)?))
            }
            None => {
                warn!("TAVILY_API_KEY not set, report generation disabled");
                None
            }
        };

        let scraper = Scraper::new(&ScraperConfig {
            render_service_url: config.render_service_url.clone(),
            ..ScraperConfig::default()
        })?;
        if !scraper.has_renderer() {
            info!("No render service configured, scraping uses plain HTTP only");
        }
        let relevance = RelevanceScorer::new(llm, &config.llm_model)?;

        Ok(Self {
            config: Arc::new(config.clone()),
            market,
            kpis,
            journal: Arc::new(journal),
            reports,
            scraper: Arc::new(scraper),
            hackernews: Arc::new(HackerNewsClient::new()),
            relevance: Arc::new(relevance),
        })
    }
}

/// Create the parent directory of a file-backed SQLite URL
fn ensure_database_dir(database_url: &str) -> anyhow::Result<()> {
    if database_url.contains(":memory:") {
        return Ok(());
    }
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(())
}
