//! Services shared by every report stage

use crate::config::ReportConfig;
use crate::search::{SearchClient, SearchResult, format_sources};
use crate::{ResearchError, Result};
use fin_llm::{CompletionRequest, LLMProvider, Message, complete_json};
use fin_prompt::PromptRegistry;
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ResearchContext {
    pub llm: Arc<dyn LLMProvider>,
    pub search: Arc<dyn SearchClient>,
    pub prompts: PromptRegistry,
    pub config: ReportConfig,
}

impl ResearchContext {
    fn request(&self, system: String, user: &str, json: bool) -> CompletionRequest {
        CompletionRequest::builder(&self.config.model)
            .system(system)
            .add_message(Message::user(user))
            .max_tokens(self.config.max_tokens)
            .temperature(self.config.temperature)
            .json_mode(json)
            .build()
    }

    pub async fn complete_text(&self, system: String, user: &str) -> Result<String> {
        let response = self.llm.complete(self.request(system, user, false)).await?;
        Ok(response.text().trim().to_string())
    }

    pub async fn complete_json<T: DeserializeOwned>(&self, system: String, user: &str) -> Result<T> {
        Ok(complete_json(self.llm.as_ref(), self.request(system, user, true)).await?)
    }

    /// Run queries concurrently and format the combined results
    ///
    /// A failing query is logged and skipped; the call fails only when
    /// every query fails.
    pub async fn search_all(&self, queries: &[String]) -> Result<String> {
        if queries.is_empty() {
            return Ok(String::new());
        }
        let max_results = self.config.max_results_per_query;

        let outcomes: Vec<Result<Vec<SearchResult>>> = stream::iter(queries.to_vec())
            .map(|query| {
                let search = Arc::clone(&self.search);
                async move { search.search(&query, max_results).await }
            })
            .buffered(self.config.concurrency)
            .collect()
            .await;

        let mut results = Vec::new();
        let mut last_error = None;
        for (query, outcome) in queries.iter().zip(outcomes) {
            match outcome {
                Ok(found) => results.extend(found),
                Err(e) => {
                    warn!(%query, error = %e, "Search query failed");
                    last_error = Some(e);
                }
            }
        }

        if results.is_empty() {
            if let Some(e) = last_error {
                return Err(ResearchError::Search(format!("all {} queries failed: {e}", queries.len())));
            }
        }
        debug!(queries = queries.len(), results = results.len(), "Searched");
        Ok(format_sources(&results, self.config.max_chars_per_source))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::prompts;
    use crate::search::MockSearchClient;

    pub fn context(llm: Arc<dyn LLMProvider>, search: MockSearchClient, config: ReportConfig) -> Arc<ResearchContext> {
        let registry = PromptRegistry::new();
        prompts::register(&registry).unwrap();
        Arc::new(ResearchContext {
            llm,
            search: Arc::new(search),
            prompts: registry,
            config,
        })
    }

    pub fn hit(url: &str) -> SearchResult {
        SearchResult {
            title: format!("About {url}"),
            url: url.to_string(),
            content: format!("content of {url}"),
            raw_content: None,
            score: 0.8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{context, hit};
    use super::*;
    use crate::search::MockSearchClient;
    use fin_llm::providers::ScriptedProvider;
    use mockall::predicate::{always, function};

    #[tokio::test]
    async fn test_search_all_skips_failed_queries() {
        let mut search = MockSearchClient::new();
        search
            .expect_search()
            .with(function(|q: &str| q == "good"), always())
            .returning(|_, _| Ok(vec![hit("https://good")]));
        search
            .expect_search()
            .with(function(|q: &str| q == "bad"), always())
            .returning(|_, _| Err(ResearchError::Search("timeout".into())));

        let ctx = context(Arc::new(ScriptedProvider::new(Vec::<String>::new())), search, ReportConfig::default());
        let queries = vec!["good".to_string(), "bad".to_string()];
        let sources = tokio::spawn(async move { ctx.search_all(&queries).await })
            .await
            .unwrap()
            .unwrap();
        assert!(sources.contains("https://good"));
    }

    #[tokio::test]
    async fn test_search_all_fails_when_every_query_fails() {
        let mut search = MockSearchClient::new();
        search
            .expect_search()
            .returning(|_, _| Err(ResearchError::Search("down".into())));

        let ctx = context(Arc::new(ScriptedProvider::new(Vec::<String>::new())), search, ReportConfig::default());
        let result = ctx.search_all(&["a".to_string(), "b".to_string()]).await;
        assert!(matches!(result, Err(ResearchError::Search(_))));
    }
}
