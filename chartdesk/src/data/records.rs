//! Persisted record shapes for the offline store.

use serde::{Deserialize, Serialize};

use super::candle::Candle;

/// One persisted candle snapshot for a symbol.
///
/// Never mutated in place: each successful fetch inserts a fresh record and
/// supersedes the older ones. Readers take the newest snapshot per symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataRecord {
    /// Assigned by the store on first write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub symbol: String,
    /// Unix milliseconds at which the snapshot was fetched.
    pub timestamp: i64,
    pub candles: Vec<Candle>,
}

impl MarketDataRecord {
    pub fn new(symbol: impl Into<String>, timestamp: i64, candles: Vec<Candle>) -> Self {
        Self {
            id: None,
            symbol: symbol.into(),
            timestamp,
            candles,
        }
    }
}

/// Color scheme selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

/// Per-user display preferences, upserted by user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub user_id: String,
    pub theme: Theme,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_symbol: Option<String>,
}
