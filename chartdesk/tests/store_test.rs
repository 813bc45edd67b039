//! Integration tests for the persistent store and repository.

use std::sync::Arc;

use chartdesk::data::{Candle, MarketDataRecord, Theme, UserPreferences};
use chartdesk::storage::{trading_schema, MarketRepository, SchemaRegistry, StoreManager};

/// Helper to build a synthetic daily candle series
fn sample_candles(count: usize, base_price: f64) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let price = base_price + i as f64 * 0.5;
            Candle::new(
                format!("{}", 1_700_000_000 + i as i64 * 86_400),
                price,
                price + 1.0,
                price - 1.0,
                price + 0.25,
                Some(1_000.0 + i as f64),
            )
        })
        .collect()
}

fn repository() -> MarketRepository {
    MarketRepository::new(Arc::new(StoreManager::in_memory(trading_schema())))
}

#[tokio::test]
async fn test_save_and_read_back_by_id() {
    let repo = repository();

    let saved = repo
        .save_market_data(MarketDataRecord::new("AAPL", 1, sample_candles(100, 180.0)))
        .await
        .unwrap();
    let id = saved.id.expect("store assigns an id");

    let read = repo.get_market_data(id).await.unwrap().unwrap();
    assert_eq!(read, saved);
    assert_eq!(read.candles.len(), 100);
}

#[tokio::test]
async fn test_symbol_lookup_returns_newest_snapshot() {
    let repo = repository();

    repo.save_market_data(MarketDataRecord::new("AAPL", 1, sample_candles(3, 180.0)))
        .await
        .unwrap();
    repo.save_market_data(MarketDataRecord::new("MSFT", 2, sample_candles(3, 400.0)))
        .await
        .unwrap();
    let newest = repo
        .save_market_data(MarketDataRecord::new("AAPL", 3, sample_candles(5, 182.0)))
        .await
        .unwrap();

    let hit = repo.get_market_data_by_symbol("AAPL").await.unwrap().unwrap();
    assert_eq!(hit, newest);

    let miss = repo.get_market_data_by_symbol("TSLA").await.unwrap();
    assert!(miss.is_none());

    let all = repo.get_all_market_data().await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_delete_removes_snapshot() {
    let repo = repository();

    let saved = repo
        .save_market_data(MarketDataRecord::new("AAPL", 1, sample_candles(3, 180.0)))
        .await
        .unwrap();
    let id = saved.id.unwrap();

    repo.delete_market_data(id).await.unwrap();
    assert!(repo.get_market_data(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_preferences_upsert_by_user_id() {
    let repo = repository();

    repo.save_user_preferences(&UserPreferences {
        user_id: "u1".to_string(),
        theme: Theme::Dark,
        default_symbol: None,
    })
    .await
    .unwrap();

    repo.save_user_preferences(&UserPreferences {
        user_id: "u1".to_string(),
        theme: Theme::Light,
        default_symbol: Some("AAPL".to_string()),
    })
    .await
    .unwrap();

    let prefs = repo.get_user_preferences("u1").await.unwrap().unwrap();
    assert_eq!(prefs.theme, Theme::Light);
    assert_eq!(prefs.default_symbol.as_deref(), Some("AAPL"));

    assert!(repo.get_user_preferences("u2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_schema_upgrade_is_idempotent() {
    let schema = trading_schema();
    let store = StoreManager::in_memory(trading_schema());
    let pool = store.connect().await.unwrap();

    // A second run with an unchanged version must change nothing.
    SchemaRegistry::new(&schema).apply(pool).await.unwrap();

    let tables: i32 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('market_data', 'user_preferences')",
    )
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(tables, 2);

    let indices: i32 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name LIKE 'market_data_by_%'",
    )
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(indices, 2);
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let store = StoreManager::in_memory(trading_schema());
    let first = store.connect().await.unwrap() as *const _;
    let second = store.connect().await.unwrap() as *const _;
    assert_eq!(first, second);
}
