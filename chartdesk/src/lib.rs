//! ChartDesk core: offline-cache-backed market data for the desktop chart.
//!
//! The crate is organized around three layers:
//! - [`storage`]: a versioned local store with named collections and
//!   secondary indices, plus the typed repository over it
//! - [`market`]: the fetch-or-fallback pipeline that keeps the chart fed
//!   while the network is away
//! - [`indicators`]: pure calculators deriving display series (RSI, MACD,
//!   SMA) from a candle series
//!
//! # Example
//!
//! ```no_run
//! use chartdesk::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(StoreManager::new("trading-app.db", trading_schema()));
//!     store.connect().await?;
//!     let client = CandleClient::new(
//!         "https://finnhub.io/api/v1".into(),
//!         "token".into(),
//!         "D".into(),
//!         100,
//!     );
//!     let service = MarketDataService::new(client, MarketRepository::new(store));
//!     let result = service.candles("AAPL").await?;
//!     println!("{} candles from {:?}", result.candles.len(), result.source);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod indicators;
pub mod market;
pub mod storage;

// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{AppEnv, Config};
    pub use crate::data::{Candle, MarketDataRecord, Theme, UserPreferences};
    pub use crate::error::{MarketDataError, StoreError};
    pub use crate::indicators::*;
    pub use crate::market::{CandleClient, DataSource, MarketDataResult, MarketDataService};
    pub use crate::storage::{trading_schema, MarketRepository, StoreManager};
}
