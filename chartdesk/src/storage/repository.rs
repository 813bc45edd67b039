//! Typed repository over the generic store.
//!
//! The one place where concrete record types meet collection names. The
//! repository holds no state of its own; it is a stateless view over the
//! store manager.

use std::sync::Arc;

use crate::data::{MarketDataRecord, UserPreferences};
use crate::error::StoreError;
use crate::storage::schema::{MARKET_DATA, USER_PREFERENCES};
use crate::storage::{Record, RecordKey, StoreManager};

impl Record for MarketDataRecord {
    const COLLECTION: &'static str = MARKET_DATA;

    fn key(&self) -> Option<RecordKey> {
        self.id.map(RecordKey::Int)
    }
}

impl Record for UserPreferences {
    const COLLECTION: &'static str = USER_PREFERENCES;

    fn key(&self) -> Option<RecordKey> {
        Some(RecordKey::Text(self.user_id.clone()))
    }
}

pub struct MarketRepository {
    store: Arc<StoreManager>,
}

impl MarketRepository {
    pub fn new(store: Arc<StoreManager>) -> Self {
        Self { store }
    }

    /// Persists a candle snapshot, returning it with its assigned id.
    pub async fn save_market_data(
        &self,
        mut record: MarketDataRecord,
    ) -> Result<MarketDataRecord, StoreError> {
        match self.store.put(&record).await? {
            RecordKey::Int(id) => record.id = Some(id),
            RecordKey::Text(key) => {
                return Err(StoreError::Operation(format!(
                    "unexpected text key {key} for market data"
                )))
            }
        }
        Ok(record)
    }

    pub async fn get_market_data(&self, id: i64) -> Result<Option<MarketDataRecord>, StoreError> {
        self.store.get(id).await
    }

    /// Most recently persisted snapshot for `symbol`, if any.
    pub async fn get_market_data_by_symbol(
        &self,
        symbol: &str,
    ) -> Result<Option<MarketDataRecord>, StoreError> {
        self.store.get_by_index("by_symbol", symbol).await
    }

    pub async fn get_all_market_data(&self) -> Result<Vec<MarketDataRecord>, StoreError> {
        self.store.get_all().await
    }

    /// Removes one snapshot. Not part of the fetch pipeline; kept for
    /// administrative cleanup.
    pub async fn delete_market_data(&self, id: i64) -> Result<(), StoreError> {
        self.store.delete::<MarketDataRecord, _>(id).await
    }

    /// Upserts preferences keyed by user id.
    pub async fn save_user_preferences(&self, prefs: &UserPreferences) -> Result<(), StoreError> {
        self.store.put(prefs).await.map(|_| ())
    }

    pub async fn get_user_preferences(
        &self,
        user_id: &str,
    ) -> Result<Option<UserPreferences>, StoreError> {
        self.store.get(user_id).await
    }
}
