//! Market data fetching and fallback orchestration.

pub mod client;
pub mod service;

pub use client::{CandleClient, CandlePayload};
pub use service::{DataSource, MarketDataResult, MarketDataService};
