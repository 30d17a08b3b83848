//! REST API for the financial assistant
//!
//! Routes are grouped per domain in [`routes`]; every handler answers with
//! an [`ApiResponse`] envelope and maps domain errors through [`AppError`].

pub mod error;
pub mod request_id;
pub mod routes;
pub mod state;

pub use error::{ApiResponse, AppError};
pub use state::AppState;

use axum::Router;
use axum::extract::Request;
use axum::middleware;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Span, info, info_span};

/// Router with every route group and the tracing/CORS layers
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health_routes())
        .merge(routes::stock_routes())
        .merge(routes::journal_routes())
        .merge(routes::report_routes())
        .merge(routes::content_routes())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(cors)
        .with_state(state)
}

fn request_span(request: &Request) -> Span {
    let request_id = request
        .headers()
        .get(&request_id::REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id,
    )
}

/// Bind `addr` and serve until ctrl-c
pub async fn run_server(state: AppState, addr: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request as HttpRequest, StatusCode};
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use fin_content::{HackerNewsClient, HtmlSource, RelevanceScorer, Scraper};
    use fin_journal::{JournalStore, PipelineConfig, StaticFxSource, TradeLogPipeline};
    use fin_llm::providers::ScriptedProvider;
    use fin_market::{
        Bar, CompanyInfo, Fundamentals, Interval, KpiManager, MarketDataSource, MarketService, Quote, Range,
        StockError,
    };
    use fin_utils::AppConfig;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Serves a fixed upward series for every symbol except `MISSING`
    struct StubMarket;

    #[async_trait]
    impl MarketDataSource for StubMarket {
        async fn history(&self, symbol: &str, _range: Range, _interval: Interval) -> fin_market::Result<Vec<Bar>> {
            if symbol == "MISSING" {
                return Err(StockError::DataUnavailable {
                    symbol: symbol.to_string(),
                    reason: "no bars".to_string(),
                });
            }
            let start = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();
            Ok((0..60)
                .map(|i| {
                    let close = 100.0 + f64::from(i);
                    Bar {
                        timestamp: start + ChronoDuration::days(i64::from(i)),
                        open: close - 0.5,
                        high: close + 1.0,
                        low: close - 1.0,
                        close,
                        volume: 1_000,
                    }
                })
                .collect())
        }

        async fn quote(&self, symbol: &str) -> fin_market::Result<Quote> {
            Ok(Quote {
                symbol: symbol.to_string(),
                timestamp: Utc::now(),
                price: 159.0,
                volume: 1_000,
                currency: Some("USD".to_string()),
            })
        }

        async fn fundamentals(&self, _symbol: &str) -> fin_market::Result<Fundamentals> {
            Ok(Fundamentals::default())
        }

        async fn company_info(&self, symbol: &str) -> fin_market::Result<CompanyInfo> {
            if symbol == "MISSING" {
                return Err(StockError::YahooFinanceError("unknown symbol".to_string()));
            }
            Ok(CompanyInfo {
                symbol: symbol.to_string(),
                name: Some("Apple Inc.".to_string()),
                ..CompanyInfo::default()
            })
        }
    }

    struct NoHtml;

    #[async_trait]
    impl HtmlSource for NoHtml {
        async fn fetch_html(&self, url: &str) -> fin_content::Result<String> {
            Err(fin_content::ContentError::EmptyPage(url.to_string()))
        }
    }

    async fn state(replies: &[&str]) -> AppState {
        let llm = Arc::new(ScriptedProvider::new(replies.iter().map(|r| r.to_string())));
        let source: Arc<dyn MarketDataSource> = Arc::new(StubMarket);
        let ttl = Duration::from_secs(60);
        let store = JournalStore::new("sqlite::memory:").await.unwrap();
        let fx = StaticFxSource::new().with_rate("EUR", "USD", 1.1);
        let journal =
            TradeLogPipeline::new(llm.clone(), Arc::new(fx), store, PipelineConfig::new("m", "USD")).unwrap();
        let scraper = Scraper::with_sources(Arc::new(NoHtml), None, 200).unwrap();

        AppState {
            config: Arc::new(AppConfig::default()),
            market: MarketService::new(Arc::clone(&source), ttl),
            kpis: Arc::new(KpiManager::new(source, ttl)),
            journal: Arc::new(journal),
            reports: None,
            scraper: Arc::new(scraper),
            hackernews: Arc::new(HackerNewsClient::new().with_base_url("http://127.0.0.1:9")),
            relevance: Arc::new(RelevanceScorer::new(llm, "m").unwrap()),
        }
    }

    async fn send(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = HttpRequest::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = app(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let state = state(&[]).await;
        let (status, body) = send(&state, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
        assert_eq!(body["data"]["reports_enabled"], false);
    }

    #[tokio::test]
    async fn test_request_id_echoed() {
        let state = state(&[]).await;
        let request = HttpRequest::builder()
            .uri("/health")
            .header("x-request-id", "abc-123")
            .body(Body::empty())
            .unwrap();
        let response = app(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "abc-123");

        let request = HttpRequest::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app(state).oneshot(request).await.unwrap();
        let minted = response.headers()["x-request-id"].to_str().unwrap();
        assert_eq!(minted.len(), 36);
    }

    #[tokio::test]
    async fn test_market_hours() {
        let state = state(&[]).await;
        let (status, body) = send(&state, "GET", "/api/market-hours/nyse", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["timezone"], "America/New_York");

        let (status, body) = send(&state, "GET", "/api/market-hours/MOON", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_chart_and_bad_params() {
        let state = state(&[]).await;
        let (status, body) = send(&state, "GET", "/api/stocks/aapl/chart?range=3mo&indicators=SMA_20,RSI", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["data"].as_array().is_some_and(|traces| !traces.is_empty()));

        let (status, body) =
            send(&state, "GET", "/api/stocks/AAPL/chart?indicators=SMA_2305843009213693952", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, _) = send(&state, "GET", "/api/stocks/AAPL/chart?range=7y", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&state, "GET", "/api/stocks/AAPL/chart?indicators=FOO", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_overview_reports_partial_failures() {
        let state = state(&[]).await;
        let (status, body) = send(&state, "GET", "/api/stocks/aapl", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["symbol"], "AAPL");
        assert!(body["data"]["chart"]["error"].is_null());
        assert_eq!(body["data"]["info"]["data"]["name"], "Apple Inc.");

        let (status, body) = send(&state, "GET", "/api/stocks/MISSING", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["chart"]["data"].is_null());
        assert!(body["data"]["chart"]["error"].as_str().is_some());
        assert!(body["data"]["info"]["error"].as_str().is_some());
        assert!(body["data"]["market_hours"]["session"].is_string());
    }

    #[tokio::test]
    async fn test_info_maps_upstream_error() {
        let state = state(&[]).await;
        let (status, _) = send(&state, "GET", "/api/stocks/MISSING/info", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_journal_lifecycle() {
        let state = state(&[
            r#"{"is_trade_log": true, "reason": "trade"}"#,
            r#"{"trades": [{"symbol": "aapl", "direction": "long", "quantity": 10, "entry_price": 150, "exit_price": 160, "stop_loss": 145}]}"#,
        ])
        .await;

        let (status, body) = send(&state, "POST", "/api/journal", Some(json!({"text": "bought 10 AAPL at 150, sold 160"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"][0]["id"].as_i64().unwrap();

        let (status, body) = send(&state, "GET", "/api/journal?symbol=aapl", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 1);

        let (status, body) = send(&state, "GET", "/api/journal/summary", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["trades"], 1);

        let (status, _) = send(&state, "GET", &format!("/api/journal/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&state, "DELETE", &format!("/api/journal/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&state, "GET", &format!("/api/journal/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_journal_rejects_non_trade_text() {
        let state = state(&[r#"{"is_trade_log": false, "reason": "a recipe"}"#]).await;
        let (status, body) = send(&state, "POST", "/api/journal", Some(json!({"text": "two eggs and flour"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("recipe"));

        let (status, _) = send(&state, "POST", "/api/journal", Some(json!({"text": "  "}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_reports_unavailable_without_search() {
        let state = state(&[]).await;
        let (status, _) = send(&state, "POST", "/api/reports", Some(json!({"topic": "NVDA"}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_content_routes() {
        let state = state(&[r#"{"score": 7, "reasoning": "on topic"}"#]).await;

        let (status, _) = send(&state, "POST", "/api/content/scrape", Some(json!({"url": "ftp://example.com"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&state, "GET", "/api/content/hackernews?feed=hot", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &state,
            "POST",
            "/api/content/relevance",
            Some(json!({"topic": "chips", "texts": ["TSMC capacity", ""]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["score"], 7);
        assert_eq!(body["data"][1]["score"], 0);
    }
}
