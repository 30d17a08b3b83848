//! Market data, charts, KPIs and exchange hours

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::Utc;
use fin_market::{
    CompanyInfo, Exchange, IndicatorKind, Interval, KpiReport, MarketStatus, Range, StockError, market_status, normalize_symbol,
    parse_indicator_list,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use super::parse_or_default;
use crate::{ApiResponse, AppError, AppState};

/// Indicators drawn when the overview is requested without a list
const DEFAULT_INDICATORS: &str = "SMA_20,SMA_50,RSI,MACD";

#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    pub range: Option<String>,
    pub interval: Option<String>,
    pub indicators: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub range: Option<String>,
}

/// One independently computed part of the overview
#[derive(Debug, Serialize)]
pub struct Part<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> From<Result<T, StockError>> for Part<T> {
    fn from(result: Result<T, StockError>) -> Self {
        match result {
            Ok(data) => Self {
                data: Some(data),
                error: None,
            },
            Err(e) => Self {
                data: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StockOverview {
    pub symbol: String,
    pub chart: Part<Value>,
    pub kpis: Part<KpiReport>,
    pub info: Part<CompanyInfo>,
    pub market_hours: MarketStatus,
}

pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stocks/{symbol}", get(overview))
        .route("/api/stocks/{symbol}/chart", get(chart))
        .route("/api/stocks/{symbol}/kpis", get(kpis))
        .route("/api/stocks/{symbol}/info", get(info))
        .route("/api/market-hours/{exchange}", get(hours))
}

struct ChartParams {
    range: Range,
    interval: Interval,
    indicators: Vec<IndicatorKind>,
}

fn chart_params(query: &ChartQuery, default_indicators: &str) -> Result<ChartParams, AppError> {
    let indicators = match query.indicators.as_deref() {
        Some(list) => parse_indicator_list(list)?,
        None => parse_indicator_list(default_indicators)?,
    };
    Ok(ChartParams {
        range: parse_or_default(query.range.as_deref())?,
        interval: parse_or_default(query.interval.as_deref())?,
        indicators,
    })
}

/// Chart, KPIs, company info and market hours in one call
///
/// Each part fails independently; only an invalid symbol or parameter
/// fails the request.
#[instrument(skip(state, query))]
async fn overview(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<ApiResponse<StockOverview>>, AppError> {
    let symbol = normalize_symbol(&symbol)?;
    let params = chart_params(&query, DEFAULT_INDICATORS)?;

    let (chart, kpis, info) = tokio::join!(
        state
            .market
            .chart(&symbol, params.range, params.interval, &params.indicators),
        state.kpis.kpis(&symbol, params.range),
        state.market.company_info(&symbol),
    );
    let market_hours = market_status(Exchange::for_symbol(&symbol), Utc::now());

    Ok(Json(ApiResponse::success(StockOverview {
        symbol,
        chart: chart.map(|c| c.to_plotly()).into(),
        kpis: kpis.into(),
        info: info.into(),
        market_hours,
    })))
}

#[instrument(skip(state, query))]
async fn chart(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let params = chart_params(&query, "")?;
    let chart = state
        .market
        .chart(&symbol, params.range, params.interval, &params.indicators)
        .await?;
    Ok(Json(ApiResponse::success(chart.to_plotly())))
}

#[instrument(skip(state, query))]
async fn kpis(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<ApiResponse<KpiReport>>, AppError> {
    let symbol = normalize_symbol(&symbol)?;
    let range = parse_or_default(query.range.as_deref())?;
    let report = state.kpis.kpis(&symbol, range).await?;
    Ok(Json(ApiResponse::success(report)))
}

#[instrument(skip(state))]
async fn info(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<CompanyInfo>>, AppError> {
    let info = state.market.company_info(&symbol).await?;
    Ok(Json(ApiResponse::success(info)))
}

async fn hours(Path(exchange): Path<String>) -> Result<Json<ApiResponse<MarketStatus>>, AppError> {
    let exchange: Exchange = exchange.parse()?;
    Ok(Json(ApiResponse::success(market_status(exchange, Utc::now()))))
}
