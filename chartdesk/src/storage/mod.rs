//! Persistent offline store.
//!
//! A thin transactional layer over a local SQLite database. Named
//! collections hold JSON-encoded records addressed by a primary key, with
//! secondary indices over record fields declared in the schema. The store
//! stays generic; the repository binds one concrete record type per
//! collection.

pub mod manager;
pub mod repository;
pub mod schema;

pub use manager::{AccessMode, CollectionHandle, StoreManager};
pub use repository::MarketRepository;
pub use schema::{
    trading_schema, CollectionSchema, DatabaseSchema, IndexSchema, KeyKind, SchemaRegistry,
};

use serde::{de::DeserializeOwned, Serialize};

/// Primary-key or index value of a stored record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordKey {
    Int(i64),
    Text(String),
}

impl From<i64> for RecordKey {
    fn from(value: i64) -> Self {
        RecordKey::Int(value)
    }
}

impl From<&str> for RecordKey {
    fn from(value: &str) -> Self {
        RecordKey::Text(value.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(value: String) -> Self {
        RecordKey::Text(value)
    }
}

/// Binds a record type to the collection that stores it.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    /// Name of the collection this record lives in.
    const COLLECTION: &'static str;

    /// Primary key of this record, if one has been assigned.
    fn key(&self) -> Option<RecordKey>;
}
