//! End-to-end tests for the fetch-or-fallback pipeline, against a local
//! stub of the upstream candle endpoint.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use chartdesk::data::{Candle, MarketDataRecord};
use chartdesk::error::MarketDataError;
use chartdesk::market::{CandleClient, DataSource, MarketDataService};
use chartdesk::storage::{trading_schema, MarketRepository, StoreManager};

/// Serves a fixed three-candle columnar payload on `/stock/candle`.
async fn spawn_candle_stub() -> (String, tokio::task::JoinHandle<()>) {
    let app = Router::new().route(
        "/stock/candle",
        get(|| async {
            Json(json!({
                "s": "ok",
                "t": [1700000000i64, 1700086400i64, 1700172800i64],
                "o": [10.0, 11.0, 12.0],
                "h": [10.5, 11.5, 12.5],
                "l": [9.5, 10.5, 11.5],
                "c": [10.25, 11.25, 12.25],
                "v": [100.0, 110.0, 120.0]
            }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), handle)
}

fn service(base_url: &str, store: Arc<StoreManager>) -> MarketDataService {
    MarketDataService::new(
        CandleClient::new(base_url.to_string(), "test-token".to_string(), "D".to_string(), 100),
        MarketRepository::new(store),
    )
}

#[tokio::test]
async fn test_network_success_is_returned_and_cached() {
    let (base_url, server) = spawn_candle_stub().await;
    let store = Arc::new(StoreManager::in_memory(trading_schema()));
    let service = service(&base_url, store.clone());

    let result = service.candles("AAPL").await.unwrap();
    assert_eq!(result.source, DataSource::Network);
    assert!(!result.degraded);
    assert_eq!(result.candles.len(), 3);
    assert_eq!(result.candles[0].time, "1700000000");
    assert_eq!(result.candles[2].close, 12.25);
    assert_eq!(result.candles[0].volume, Some(100.0));

    // Write-then-read consistency: the cache now holds the same series,
    // retrievable through the symbol index.
    let repo = MarketRepository::new(store);
    let cached = repo.get_market_data_by_symbol("AAPL").await.unwrap().unwrap();
    assert_eq!(cached.symbol, "AAPL");
    assert_eq!(cached.candles, result.candles);

    server.abort();
}

#[tokio::test]
async fn test_network_failure_falls_back_to_cache() {
    let store = Arc::new(StoreManager::in_memory(trading_schema()));
    let repo = MarketRepository::new(store.clone());
    let candles = vec![
        Candle::new("1700000000", 10.0, 10.5, 9.5, 10.25, Some(100.0)),
        Candle::new("1700086400", 11.0, 11.5, 10.5, 11.25, Some(110.0)),
    ];
    repo.save_market_data(MarketDataRecord::new("AAPL", 1, candles.clone()))
        .await
        .unwrap();

    // Port 9 (discard) is closed; the fetch fails at connect.
    let service = service("http://127.0.0.1:9", store);
    let result = service.candles("AAPL").await.unwrap();
    assert_eq!(result.source, DataSource::Cache);
    assert!(result.degraded);
    assert_eq!(result.candles, candles);
}

#[tokio::test]
async fn test_fallback_serves_newest_snapshot() {
    let store = Arc::new(StoreManager::in_memory(trading_schema()));
    let repo = MarketRepository::new(store.clone());

    let stale = vec![Candle::new("1700000000", 1.0, 2.0, 0.5, 1.5, None)];
    let fresh = vec![Candle::new("1700086400", 2.0, 3.0, 1.5, 2.5, None)];
    repo.save_market_data(MarketDataRecord::new("AAPL", 1, stale))
        .await
        .unwrap();
    repo.save_market_data(MarketDataRecord::new("AAPL", 2, fresh.clone()))
        .await
        .unwrap();

    let service = service("http://127.0.0.1:9", store);
    let result = service.candles("AAPL").await.unwrap();
    assert_eq!(result.candles, fresh);
}

#[tokio::test]
async fn test_empty_cache_and_no_network_is_unavailable() {
    let store = Arc::new(StoreManager::in_memory(trading_schema()));
    let service = service("http://127.0.0.1:9", store);

    let err = service.candles("AAPL").await.unwrap_err();
    assert!(matches!(err, MarketDataError::ServiceUnavailable));
}

#[tokio::test]
async fn test_cache_write_failure_keeps_network_result() {
    let (base_url, server) = spawn_candle_stub().await;
    // The parent directory does not exist, so the store can never open and
    // every cache write fails.
    let store = Arc::new(StoreManager::new(
        "/nonexistent-chartdesk-dir/trading-app.db",
        trading_schema(),
    ));
    let service = service(&base_url, store);

    let result = service.candles("AAPL").await.unwrap();
    assert_eq!(result.source, DataSource::Network);
    assert!(!result.degraded);
    assert_eq!(result.candles.len(), 3);

    server.abort();
}
