//! Scraping, HackerNews and relevance scoring

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use chrono::Utc;
use fin_content::{Feed, Relevance, ScrapedPage, Story, StoryFilter};
use serde::Deserialize;
use tracing::instrument;

use super::parse_or_default;
use crate::{ApiResponse, AppError, AppState};

const DEFAULT_STORY_LIMIT: usize = 30;

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HackerNewsQuery {
    pub feed: Option<String>,
    pub limit: Option<usize>,
    pub min_score: Option<u32>,
    /// Comma separated
    pub keywords: Option<String>,
    pub max_age_hours: Option<u64>,
    #[serde(default)]
    pub require_url: bool,
}

#[derive(Debug, Deserialize)]
pub struct RelevanceRequest {
    pub topic: String,
    pub texts: Vec<String>,
}

pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/api/content/scrape", post(scrape))
        .route("/api/content/hackernews", get(hackernews))
        .route("/api/content/relevance", post(relevance))
}

#[instrument(skip(state, request), fields(url = %request.url))]
async fn scrape(
    State(state): State<AppState>,
    Json(request): Json<ScrapeRequest>,
) -> Result<Json<ApiResponse<ScrapedPage>>, AppError> {
    let page = state.scraper.fetch(&request.url).await?;
    Ok(Json(ApiResponse::success(page)))
}

#[instrument(skip(state))]
async fn hackernews(
    State(state): State<AppState>,
    Query(query): Query<HackerNewsQuery>,
) -> Result<Json<ApiResponse<Vec<Story>>>, AppError> {
    let feed: Feed = parse_or_default(query.feed.as_deref())?;
    let filter = StoryFilter {
        min_score: query.min_score,
        keywords: query
            .keywords
            .as_deref()
            .map(|k| k.split(',').map(str::to_string).collect())
            .unwrap_or_default(),
        max_age_hours: query.max_age_hours,
        require_url: query.require_url,
    };
    let stories = state
        .hackernews
        .stories(feed, query.limit.unwrap_or(DEFAULT_STORY_LIMIT))
        .await?;
    Ok(Json(ApiResponse::success(filter.apply(stories, Utc::now()))))
}

#[instrument(skip(state, request), fields(topic = %request.topic, count = request.texts.len()))]
async fn relevance(
    State(state): State<AppState>,
    Json(request): Json<RelevanceRequest>,
) -> Result<Json<ApiResponse<Vec<Relevance>>>, AppError> {
    let scores = state.relevance.score_all(&request.topic, &request.texts).await?;
    Ok(Json(ApiResponse::success(scores)))
}
