use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::{ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
    pub reports_enabled: bool,
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> Json<ApiResponse<Health>> {
    Json(ApiResponse::success(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        reports_enabled: state.reports.is_some(),
    }))
}
