//! Trading journal: ingest free-text logs, browse and summarize entries

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use fin_journal::{JournalEntry, JournalSummary, Page};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::{ApiResponse, AppError, AppState};

const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub symbol: Option<String>,
}

pub fn journal_routes() -> Router<AppState> {
    Router::new()
        .route("/api/journal", get(list_entries).post(ingest))
        .route("/api/journal/summary", get(summary))
        .route("/api/journal/{id}", get(get_entry).delete(delete_entry))
}

/// Run a raw trade log through the extraction pipeline and store the trades
#[instrument(skip(state, request), fields(len = request.text.len()))]
async fn ingest(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<JournalEntry>>>), AppError> {
    let entries = state.journal.process(&request.text).await?;
    info!(stored = entries.len(), "Trade log ingested");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(entries))))
}

async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Page<JournalEntry>>>, AppError> {
    let symbol = query.symbol.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let page = state
        .journal
        .store()
        .list(
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            symbol,
        )
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

async fn summary(State(state): State<AppState>) -> Result<Json<ApiResponse<JournalSummary>>, AppError> {
    let summary = state.journal.store().summary().await?;
    Ok(Json(ApiResponse::success(summary)))
}

async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<JournalEntry>>, AppError> {
    let entry = state.journal.store().get(id).await?;
    Ok(Json(ApiResponse::success(entry)))
}

async fn delete_entry(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, AppError> {
    state.journal.store().delete(id).await?;
    info!(id, "Journal entry deleted");
    Ok(StatusCode::NO_CONTENT)
}
