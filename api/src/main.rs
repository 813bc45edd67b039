use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use chartdesk::config::Config;
use chartdesk::data::{Candle, UserPreferences};
use chartdesk::error::MarketDataError;
use chartdesk::indicators::{macd_points, rsi_points, sma_points, IndicatorPoint};
use chartdesk::market::{CandleClient, DataSource, MarketDataService};
use chartdesk::storage::{trading_schema, MarketRepository, StoreManager};

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    service: Arc<MarketDataService>,
    repository: Arc<MarketRepository>,
}

impl AppState {
    async fn new() -> Result<Self> {
        let config = Config::from_env()?;

        // The store lifecycle belongs to the process entry point; it is
        // opened eagerly here and handed to everything that needs it.
        let store = Arc::new(StoreManager::new(&config.database_path, trading_schema()));
        store.connect().await?;
        info!(path = %config.database_path, "store opened");

        let repository = Arc::new(MarketRepository::new(store.clone()));
        let service = Arc::new(MarketDataService::new(
            CandleClient::from_config(&config),
            MarketRepository::new(store),
        ));

        Ok(AppState {
            config: Arc::new(config),
            service,
            repository,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting ChartDesk API server...");

    let state = AppState::new().await?;
    info!(
        env = ?state.config.app_env,
        cache_enabled = state.config.cache_enabled,
        "configuration loaded"
    );

    let bind_addr = state.config.api_bind_addr.clone();
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/market-data", get(market_data))
        .route("/api/indicators/rsi", get(rsi))
        .route("/api/indicators/sma", get(sma))
        .route("/api/indicators/macd", get(macd))
        .route(
            "/api/preferences/:user_id",
            get(get_preferences).put(save_preferences),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct MarketDataParams {
    symbol: Option<String>,
}

/// The chart's data feed: the candle array on success (network or cache,
/// provenance in the `x-data-source` header), 503 when neither is available.
async fn market_data(
    State(state): State<AppState>,
    Query(params): Query<MarketDataParams>,
) -> Response {
    let symbol = params
        .symbol
        .unwrap_or_else(|| state.config.default_symbol.clone());

    match state.service.candles(&symbol).await {
        Ok(result) => {
            if result.degraded {
                warn!(%symbol, "serving cached candles, network source unavailable");
            }
            let source = match result.source {
                DataSource::Network => "network",
                DataSource::Cache => "cache",
            };
            (StatusCode::OK, [("x-data-source", source)], Json(result.candles)).into_response()
        }
        Err(MarketDataError::ServiceUnavailable) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Service unavailable" })),
        )
            .into_response(),
        Err(err) => {
            warn!(%symbol, error = %err, "unrecovered market data error");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "upstream failure" })),
            )
                .into_response()
        }
    }
}

/// Runs the orchestrator for `symbol` and serves `build` applied to
/// whatever candle series it produced.
async fn indicator_points<F>(state: &AppState, symbol: Option<String>, build: F) -> Response
where
    F: FnOnce(&[Candle]) -> Vec<IndicatorPoint>,
{
    let symbol = symbol.unwrap_or_else(|| state.config.default_symbol.clone());
    match state.service.candles(&symbol).await {
        Ok(result) => Json(build(&result.candles)).into_response(),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Service unavailable" })),
        )
            .into_response(),
    }
}

/// A zero period would panic the indicator constructors; reject it before
/// it gets there.
fn invalid_period() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "period must be at least 1" })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct IndicatorParams {
    symbol: Option<String>,
    period: Option<usize>,
}

async fn rsi(State(state): State<AppState>, Query(params): Query<IndicatorParams>) -> Response {
    let period = params.period.unwrap_or(14);
    if period == 0 {
        return invalid_period();
    }
    indicator_points(&state, params.symbol, |candles| rsi_points(candles, period)).await
}

async fn sma(State(state): State<AppState>, Query(params): Query<IndicatorParams>) -> Response {
    let period = params.period.unwrap_or(20);
    if period == 0 {
        return invalid_period();
    }
    indicator_points(&state, params.symbol, |candles| sma_points(candles, period)).await
}

#[derive(Debug, Deserialize)]
struct MacdParams {
    symbol: Option<String>,
    fast: Option<usize>,
    slow: Option<usize>,
    signal: Option<usize>,
}

async fn macd(State(state): State<AppState>, Query(params): Query<MacdParams>) -> Response {
    let fast = params.fast.unwrap_or(12);
    let slow = params.slow.unwrap_or(26);
    let signal = params.signal.unwrap_or(9);
    if fast == 0 || slow == 0 || signal == 0 {
        return invalid_period();
    }
    indicator_points(&state, params.symbol, |candles| {
        macd_points(candles, fast, slow, signal)
    })
    .await
}

async fn get_preferences(State(state): State<AppState>, Path(user_id): Path<String>) -> Response {
    match state.repository.get_user_preferences(&user_id).await {
        Ok(Some(prefs)) => Json(prefs).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no preferences saved" })),
        )
            .into_response(),
        Err(err) => {
            warn!(%user_id, error = %err, "preference read failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "store failure" })),
            )
                .into_response()
        }
    }
}

async fn save_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(mut prefs): Json<UserPreferences>,
) -> Response {
    prefs.user_id = user_id;
    match state.repository.save_user_preferences(&prefs).await {
        Ok(()) => Json(prefs).into_response(),
        Err(err) => {
            warn!(user_id = %prefs.user_id, error = %err, "preference write failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "store failure" })),
            )
                .into_response()
        }
    }
}
