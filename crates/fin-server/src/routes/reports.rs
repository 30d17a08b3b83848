//! Research report generation

use axum::{Json, Router, extract::State, routing::post};
use fin_research::Report;
use serde::Deserialize;
use tracing::instrument;

use crate::{ApiResponse, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub topic: String,
    pub report_structure: Option<String>,
}

pub fn report_routes() -> Router<AppState> {
    Router::new().route("/api/reports", post(create_report))
}

#[instrument(skip(state, request), fields(topic = %request.topic))]
async fn create_report(
    State(state): State<AppState>,
    Json(request): Json<ReportRequest>,
) -> Result<Json<ApiResponse<Report>>, AppError> {
    let runner = state
        .reports
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("report generation needs TAVILY_API_KEY".to_string()))?;
    let report = runner
        .run(&request.topic, request.report_structure.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(report)))
}
