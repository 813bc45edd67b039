//! Fetch-or-fallback orchestration.
//!
//! The reliability policy of the system: per request, try the network once;
//! on success persist and return, on failure serve the newest cached
//! snapshot. Only an empty cache behind a failed fetch is an error.

use chrono::Utc;
use serde::Serialize;
use tracing::{error, warn};

use crate::data::{Candle, MarketDataRecord};
use crate::error::MarketDataError;
use crate::market::client::CandleClient;
use crate::storage::MarketRepository;

/// Where a candle series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Network,
    Cache,
}

/// A candle series together with its provenance.
#[derive(Debug, Clone, Serialize)]
pub struct MarketDataResult {
    pub candles: Vec<Candle>,
    pub source: DataSource,
    /// True when the series was served from cache because the network
    /// source was unavailable.
    pub degraded: bool,
}

pub struct MarketDataService {
    client: CandleClient,
    repository: MarketRepository,
}

impl MarketDataService {
    pub fn new(client: CandleClient, repository: MarketRepository) -> Self {
        Self { client, repository }
    }

    /// Fetches the candle series for `symbol`, falling back to the newest
    /// cached snapshot when the network path fails. Fails with
    /// [`MarketDataError::ServiceUnavailable`] only when both paths come up
    /// empty.
    pub async fn candles(&self, symbol: &str) -> Result<MarketDataResult, MarketDataError> {
        match self.client.candles(symbol).await {
            Ok(candles) => {
                let record = MarketDataRecord::new(
                    symbol,
                    Utc::now().timestamp_millis(),
                    candles.clone(),
                );
                // A failed cache write never costs the caller the data
                // already in hand.
                if let Err(err) = self.repository.save_market_data(record).await {
                    warn!(%symbol, error = %err, "failed to cache fetched candles");
                }
                Ok(MarketDataResult {
                    candles,
                    source: DataSource::Network,
                    degraded: false,
                })
            }
            Err(err) => {
                warn!(%symbol, error = %err, "network fetch failed, reading cache");
                self.cached(symbol).await
            }
        }
    }

    async fn cached(&self, symbol: &str) -> Result<MarketDataResult, MarketDataError> {
        let snapshot = match self.repository.get_market_data_by_symbol(symbol).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(%symbol, error = %err, "cache read failed during fallback");
                None
            }
        };
        match snapshot {
            Some(record) => Ok(MarketDataResult {
                candles: record.candles,
                source: DataSource::Cache,
                degraded: true,
            }),
            None => Err(MarketDataError::ServiceUnavailable),
        }
    }
}
