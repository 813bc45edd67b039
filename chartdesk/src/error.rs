//! Error types for the store and the market data pipeline.

use thiserror::Error;

/// Errors raised by the persistent store.
///
/// A lookup that finds nothing is not an error; those paths return
/// `Ok(None)` instead.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying database could not be opened or upgraded.
    #[error("failed to open store: {0}")]
    Connection(#[source] sqlx::Error),

    /// A transaction aborted before its work became visible.
    #[error("store transaction aborted: {0}")]
    Transaction(#[source] sqlx::Error),

    /// A batched write aborted; none of the batch is visible.
    #[error("bulk write aborted: {0}")]
    BulkWrite(#[source] sqlx::Error),

    /// The request itself was malformed: unknown collection or index,
    /// mismatched key kind, or a record that failed to encode/decode.
    #[error("invalid store operation: {0}")]
    Operation(String),
}

/// Errors raised by the fetch-or-fallback pipeline.
#[derive(Debug, Error)]
pub enum MarketDataError {
    /// The upstream request failed or returned a non-success status.
    #[error("market data request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The upstream answered but the payload did not have the expected shape.
    #[error("unexpected market data payload: {0}")]
    MalformedPayload(String),

    /// No network result and no cached snapshot. The only error surfaced to
    /// the end user.
    #[error("market data unavailable: no network result and no cached snapshot")]
    ServiceUnavailable,
}
