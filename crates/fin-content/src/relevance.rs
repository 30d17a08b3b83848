//! LLM topic relevance scoring

use crate::hackernews::Story;
use crate::{ContentError, Result};
use fin_llm::{CompletionRequest, LLMProvider, Message, complete_json};
use fin_prompt::{JinjaTemplate, PromptRegistry};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const RELEVANCE_PROMPT: &str = "content.relevance";
pub const MAX_SCORE: u8 = 10;

const RELEVANCE_TEMPLATE: &str = r#"You rate how relevant a piece of content is to a topic of interest
for an investor.

<Topic>
{{ topic }}
</Topic>

Score from 0 (unrelated) to 10 (directly about the topic and useful for an
investment decision). Reply with JSON only:
{"score": <0-10>, "reasoning": "<one sentence>"}"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relevance {
    /// 0..=10
    pub score: u8,
    pub reasoning: String,
}

#[derive(Debug, Deserialize)]
struct RawRelevance {
    score: f64,
    #[serde(default)]
    reasoning: String,
}

impl From<RawRelevance> for Relevance {
    fn from(raw: RawRelevance) -> Self {
        let score = if raw.score.is_finite() {
            raw.score.round().clamp(0.0, f64::from(MAX_SCORE)) as u8
        } else {
            0
        };
        Self {
            score,
            reasoning: raw.reasoning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedStory {
    #[serde(flatten)]
    pub story: Story,
    pub relevance: Relevance,
}

pub struct RelevanceScorer {
    llm: Arc<dyn LLMProvider>,
    prompts: PromptRegistry,
    model: String,
    concurrency: usize,
    max_text_chars: usize,
}

impl RelevanceScorer {
    pub fn new(llm: Arc<dyn LLMProvider>, model: impl Into<String>) -> Result<Self> {
        let prompts = PromptRegistry::new();
        prompts.register(JinjaTemplate::new(RELEVANCE_PROMPT, RELEVANCE_TEMPLATE)?);
        Ok(Self {
            llm,
            prompts,
            model: model.into(),
            concurrency: 5,
            max_text_chars: 4_000,
        })
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Score `text` against `topic`
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub async fn score(&self, topic: &str, text: &str) -> Result<Relevance> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ContentError::InvalidParameter("topic is empty".to_string()));
        }
        let text = match text.trim().char_indices().nth(self.max_text_chars) {
            Some((cut, _)) => &text.trim()[..cut],
            None => text.trim(),
        };
        if text.is_empty() {
            return Ok(Relevance {
                score: 0,
                reasoning: "no content".to_string(),
            });
        }

        let system = self.prompts.render(RELEVANCE_PROMPT, &json!({ "topic": topic }))?;
        let request = CompletionRequest::builder(&self.model)
            .system(system)
            .add_message(Message::user(format!("Content:\n{text}")))
            .max_tokens(256)
            .temperature(0.0)
            .json_mode(true)
            .build();

        let raw: RawRelevance = complete_json(self.llm.as_ref(), request).await?;
        let relevance = Relevance::from(raw);
        debug!(score = relevance.score, "Scored");
        Ok(relevance)
    }

    /// Score several texts concurrently; results keep input order
    pub async fn score_all(&self, topic: &str, texts: &[String]) -> Result<Vec<Relevance>> {
        let scores: Vec<Result<Relevance>> = stream::iter(texts.to_vec())
            .map(|text| async move { self.score(topic, &text).await })
            .buffered(self.concurrency)
            .collect()
            .await;
        scores.into_iter().collect()
    }

    /// Stories scoring at least `threshold`, most relevant first
    ///
    /// Stories that fail to score are dropped. Ties keep feed order.
    #[instrument(skip(self, stories), fields(count = stories.len()))]
    pub async fn rank(&self, topic: &str, stories: Vec<Story>, threshold: u8) -> Result<Vec<RankedStory>> {
        if topic.trim().is_empty() {
            return Err(ContentError::InvalidParameter("topic is empty".to_string()));
        }

        let scored: Vec<Option<RankedStory>> = stream::iter(stories)
            .map(|story| async move {
                let text = match &story.url {
                    Some(url) => format!("{}\n{url}", story.title),
                    None => story.title.clone(),
                };
                match self.score(topic, &text).await {
                    Ok(relevance) => Some(RankedStory { story, relevance }),
                    Err(e) => {
                        warn!(id = story.id, error = %e, "Could not score story");
                        None
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut ranked: Vec<RankedStory> = scored
            .into_iter()
            .flatten()
            .filter(|r| r.relevance.score >= threshold)
            .collect();
        ranked.sort_by(|a, b| b.relevance.score.cmp(&a.relevance.score));
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fin_llm::providers::ScriptedProvider;

    fn story(id: u64, title: &str) -> Story {
        Story {
            id,
            title: title.to_string(),
            url: None,
            score: 10,
            by: None,
            time: Utc::now(),
            comments: 0,
            hn_url: format!("https://news.ycombinator.com/item?id={id}"),
        }
    }

    #[test]
    fn test_score_clamped() {
        let high = Relevance::from(RawRelevance { score: 14.2, reasoning: String::new() });
        assert_eq!(high.score, 10);
        let low = Relevance::from(RawRelevance { score: -3.0, reasoning: String::new() });
        assert_eq!(low.score, 0);
        let mid = Relevance::from(RawRelevance { score: 6.6, reasoning: String::new() });
        assert_eq!(mid.score, 7);
    }

    #[tokio::test]
    async fn test_score() {
        let llm = Arc::new(ScriptedProvider::new([r#"{"score": 8, "reasoning": "about chip demand"}"#]));
        let scorer = RelevanceScorer::new(llm.clone(), "m").unwrap();

        let relevance = scorer.score("semiconductors", "TSMC raises guidance").await.unwrap();
        assert_eq!(relevance.score, 8);
        let request = &llm.requests()[0];
        assert!(request.system.as_deref().unwrap_or_default().contains("semiconductors"));
    }

    #[tokio::test]
    async fn test_score_all_keeps_order_on_spawned_task() {
        let llm = Arc::new(ScriptedProvider::new([
            r#"{"score": 2, "reasoning": "barely"}"#,
            r#"{"score": 9, "reasoning": "direct"}"#,
        ]));
        let scorer = Arc::new(RelevanceScorer::new(llm, "m").unwrap().with_concurrency(1));
        let texts = vec!["Crop yields".to_string(), String::new(), "Oil output cut".to_string()];

        let scores = tokio::spawn({
            let scorer = Arc::clone(&scorer);
            async move { scorer.score_all("oil", &texts).await }
        })
        .await
        .unwrap()
        .unwrap();
        let values: Vec<u8> = scores.iter().map(|r| r.score).collect();
        assert_eq!(values, vec![2, 0, 9]);
    }

    #[tokio::test]
    async fn test_empty_text_skips_llm() {
        let llm = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let scorer = RelevanceScorer::new(llm.clone(), "m").unwrap();
        assert_eq!(scorer.score("gold", "   ").await.unwrap().score, 0);
        assert!(scorer.score(" ", "text").await.is_err());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_rank_orders_and_thresholds() {
        let llm = Arc::new(ScriptedProvider::new([
            r#"{"score": 3, "reasoning": "tangential"}"#,
            r#"{"score": 9, "reasoning": "direct"}"#,
            "not json at all",
            r#"{"score": 6, "reasoning": "related"}"#,
        ]));
        let scorer = RelevanceScorer::new(llm, "m").unwrap().with_concurrency(1);
        let stories = vec![story(1, "a"), story(2, "b"), story(3, "c"), story(4, "d")];

        let ranked = scorer.rank("energy", stories, 5).await.unwrap();
        let ids: Vec<u64> = ranked.iter().map(|r| r.story.id).collect();
        assert_eq!(ids, vec![2, 4]);
    }
}
