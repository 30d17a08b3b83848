//! Web search for report research

use crate::{ResearchError, Result};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, instrument};

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const TAVILY_URL: &str = "https://api.tavily.com/search";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    /// Snippet most relevant to the query
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub raw_content: Option<String>,
    #[serde(default)]
    pub score: f64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    include_raw_content: bool,
    topic: &'a str,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// Tavily search API client
pub struct TavilyClient {
    client: Client,
    api_key: String,
    base_url: String,
    rate_limiter: SharedRateLimiter,
}

impl TavilyClient {
    /// # Arguments
    /// * `api_key` - Tavily API key
    /// * `per_minute` - Request budget per minute
    pub fn new(api_key: impl Into<String>, per_minute: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN));
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: TAVILY_URL.to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SearchClient for TavilyClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&TavilyRequest {
                query,
                max_results,
                include_raw_content: true,
                topic: "general",
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ResearchError::Search(format!("Tavily API error {status}: {body}")));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::Search(format!("Failed to parse Tavily response: {e}")))?;
        debug!(results = parsed.results.len(), "Search complete");
        Ok(parsed.results)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => (&text[..cut], true),
        None => (text, false),
    }
}

/// Render results as a source list for a prompt
///
/// Results repeating an earlier URL are dropped; raw page content is cut to
/// `max_chars_per_source` characters.
pub fn format_sources(results: &[SearchResult], max_chars_per_source: usize) -> String {
    let mut seen = HashSet::new();
    let mut out = String::new();

    for result in results {
        if !seen.insert(result.url.as_str()) {
            continue;
        }
        out.push_str(&format!(
            "Source: {}\nURL: {}\nMost relevant content: {}\n",
            result.title, result.url, result.content
        ));
        if let Some(raw) = result.raw_content.as_deref().filter(|r| !r.trim().is_empty()) {
            let (text, truncated) = truncate_chars(raw.trim(), max_chars_per_source);
            out.push_str("Full content");
            if truncated {
                out.push_str(&format!(" (first {max_chars_per_source} characters)"));
            }
            out.push_str(&format!(": {text}\n"));
        }
        out.push('\n');
    }
    out
}
