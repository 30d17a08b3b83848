//! HackerNews stories via the Firebase API

use crate::{ContentError, Result};
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument, warn};

const HN_API: &str = "https://hacker-news.firebaseio.com/v0";
pub const MAX_STORIES: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feed {
    #[default]
    Top,
    New,
    Best,
    Ask,
    Show,
}

impl Feed {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::New => "new",
            Self::Best => "best",
            Self::Ask => "ask",
            Self::Show => "show",
        }
    }
}

impl FromStr for Feed {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "new" => Ok(Self::New),
            "best" => Ok(Self::Best),
            "ask" => Ok(Self::Ask),
            "show" => Ok(Self::Show),
            other => Err(ContentError::InvalidParameter(format!(
                "unknown feed '{other}' (expected top, new, best, ask or show)"
            ))),
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw item as served by the API
#[derive(Debug, Clone, Deserialize)]
struct Item {
    id: u64,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    by: Option<String>,
    #[serde(default)]
    time: Option<i64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    score: Option<u32>,
    #[serde(default)]
    descendants: Option<u32>,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    dead: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: u64,
    pub title: String,
    pub url: Option<String>,
    pub score: u32,
    pub by: Option<String>,
    pub time: DateTime<Utc>,
    pub comments: u32,
    /// Discussion page on news.ycombinator.com
    pub hn_url: String,
}

impl Item {
    /// Live stories only; deleted, dead and non-story items are dropped
    fn into_story(self) -> Option<Story> {
        if self.deleted || self.dead || self.kind.as_deref() != Some("story") {
            return None;
        }
        let title = self.title.filter(|t| !t.trim().is_empty())?;
        let time = DateTime::from_timestamp(self.time?, 0)?;
        Some(Story {
            id: self.id,
            title,
            url: self.url.filter(|u| !u.is_empty()),
            score: self.score.unwrap_or(0),
            by: self.by,
            time,
            comments: self.descendants.unwrap_or(0),
            hn_url: format!("https://news.ycombinator.com/item?id={}", self.id),
        })
    }
}

pub struct HackerNewsClient {
    client: Client,
    base_url: String,
    concurrency: usize,
}

impl HackerNewsClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: HN_API.to_string(),
            concurrency: 10,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{path}", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ContentError::Status {
                status: response.status().as_u16(),
                url,
            });
        }
        Ok(response.json().await?)
    }

    /// Up to `limit` (at most 100) live stories from `feed`, in feed order
    ///
    /// Items that fail to load are skipped.
    #[instrument(skip(self))]
    pub async fn stories(&self, feed: Feed, limit: usize) -> Result<Vec<Story>> {
        let limit = limit.clamp(1, MAX_STORIES);
        let ids: Vec<u64> = self.get_json(&format!("{}stories.json", feed.as_str())).await?;

        let items: Vec<Option<Item>> = stream::iter(ids.into_iter().take(limit))
            .map(|id| async move {
                match self.get_json::<Option<Item>>(&format!("item/{id}.json")).await {
                    Ok(item) => item,
                    Err(e) => {
                        warn!(id, error = %e, "Skipping item");
                        None
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let stories: Vec<Story> = items.into_iter().flatten().filter_map(Item::into_story).collect();
        debug!(count = stories.len(), "Fetched stories");
        Ok(stories)
    }
}

impl Default for HackerNewsClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Post-fetch story filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryFilter {
    pub min_score: Option<u32>,
    /// Any keyword in title or URL, case-insensitive
    #[serde(default)]
    pub keywords: Vec<String>,
    pub max_age_hours: Option<u64>,
    #[serde(default)]
    pub require_url: bool,
}

impl StoryFilter {
    pub fn matches(&self, story: &Story, now: DateTime<Utc>) -> bool {
        if self.min_score.is_some_and(|min| story.score < min) {
            return false;
        }
        if self.require_url && story.url.is_none() {
            return false;
        }
        if let Some(hours) = self.max_age_hours {
            // a century is effectively unbounded
            let max_age = Duration::hours(hours.min(24 * 365 * 100) as i64);
            if now.signed_duration_since(story.time) > max_age {
                return false;
            }
        }
        let keywords: Vec<String> = self
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return true;
        }
        let haystack = format!(
            "{} {}",
            story.title.to_lowercase(),
            story.url.as_deref().unwrap_or_default().to_lowercase()
        );
        keywords.iter().any(|k| haystack.contains(k.as_str()))
    }

    pub fn apply(&self, stories: Vec<Story>, now: DateTime<Utc>) -> Vec<Story> {
        stories.into_iter().filter(|s| self.matches(s, now)).collect()
    }
}
