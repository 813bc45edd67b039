//! Generic transactional store manager over a local SQLite database.

use std::path::PathBuf;

use futures::future::BoxFuture;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::StoreError;
use crate::storage::schema::{CollectionSchema, DatabaseSchema, KeyKind, SchemaRegistry};
use crate::storage::{Record, RecordKey};

/// Transaction mode of a single store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    ReadWrite,
}

/// Owns the single database handle for the process.
///
/// The handle is opened lazily on first use and never explicitly closed;
/// concurrent first callers share one in-flight open. Every operation runs
/// in its own transaction scoped to one collection.
pub struct StoreManager {
    path: PathBuf,
    schema: DatabaseSchema,
    pool: OnceCell<SqlitePool>,
}

impl StoreManager {
    pub fn new(path: impl Into<PathBuf>, schema: DatabaseSchema) -> Self {
        Self {
            path: path.into(),
            schema,
            pool: OnceCell::new(),
        }
    }

    /// Store backed by an in-memory database. Used by tests.
    pub fn in_memory(schema: DatabaseSchema) -> Self {
        Self::new(":memory:", schema)
    }

    pub fn schema(&self) -> &DatabaseSchema {
        &self.schema
    }

    /// Opens the database, running schema upgrades on first open.
    /// Idempotent; later calls return the already-open handle.
    pub async fn connect(&self) -> Result<&SqlitePool, StoreError> {
        self.pool
            .get_or_try_init(|| async {
                let options = if self.path.to_str() == Some(":memory:") {
                    SqliteConnectOptions::new().in_memory(true)
                } else {
                    SqliteConnectOptions::new()
                        .filename(&self.path)
                        .create_if_missing(true)
                };
                // Single connection: this pool is the one shared handle.
                let pool = SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_with(options)
                    .await
                    .map_err(StoreError::Connection)?;
                SchemaRegistry::new(&self.schema).apply(&pool).await?;
                debug!(
                    database = self.schema.name,
                    path = %self.path.display(),
                    "store opened"
                );
                Ok(pool)
            })
            .await
    }

    /// Runs `action` against one collection inside its own transaction.
    ///
    /// The action gets a handle scoped to the collection and returns
    /// `Ok(Some(value))` to commit, `Ok(None)` when it had no operation to
    /// run, or `Err` to abort.
    pub async fn execute<T>(
        &self,
        collection: &str,
        mode: AccessMode,
        action: impl for<'t> FnOnce(
            CollectionHandle<'t>,
        ) -> BoxFuture<'t, Result<Option<T>, sqlx::Error>>,
    ) -> Result<T, StoreError>
    where
        T: Send,
    {
        let schema = self.collection_schema(collection)?;
        let pool = self.connect().await?;
        let mut tx = pool.begin().await.map_err(StoreError::Transaction)?;

        let outcome = action(CollectionHandle {
            tx: &mut tx,
            schema,
            mode,
        })
        .await;

        match outcome {
            Ok(Some(value)) => {
                tx.commit().await.map_err(StoreError::Transaction)?;
                Ok(value)
            }
            Ok(None) => {
                let _ = tx.rollback().await;
                Err(StoreError::Operation(format!(
                    "no operation produced for collection {collection}"
                )))
            }
            Err(err) => {
                let _ = tx.rollback().await;
                Err(StoreError::Transaction(err))
            }
        }
    }

    /// Upserts `record` by primary key, returning the key it landed under.
    /// Auto-increment collections assign the key and write it back into the
    /// stored payload.
    pub async fn put<R: Record>(&self, record: &R) -> Result<RecordKey, StoreError> {
        let schema = self.collection_schema(R::COLLECTION)?;
        let key = record.key();
        Self::check_key_kind(schema, key.as_ref())?;
        let payload = Self::encode(record)?;
        self.execute(R::COLLECTION, AccessMode::ReadWrite, move |mut handle| {
            Box::pin(async move { handle.put_value(key, &payload).await.map(Some) })
        })
        .await
    }

    /// Fetches one record by primary key. Absence is not an error.
    pub async fn get<R: Record, K: Into<RecordKey>>(
        &self,
        key: K,
    ) -> Result<Option<R>, StoreError> {
        let key = key.into();
        let payload = self
            .execute(R::COLLECTION, AccessMode::Read, move |mut handle| {
                Box::pin(async move { handle.get_value(&key).await.map(Some) })
            })
            .await?;
        payload.map(|data| Self::decode(&data)).transpose()
    }

    /// Fetches every record of the collection in key order.
    pub async fn get_all<R: Record>(&self) -> Result<Vec<R>, StoreError> {
        let rows = self
            .execute(R::COLLECTION, AccessMode::Read, |mut handle| {
                Box::pin(async move { handle.all_values().await.map(Some) })
            })
            .await?;
        rows.iter().map(|data| Self::decode(data)).collect()
    }

    /// Removes one record by primary key.
    pub async fn delete<R: Record, K: Into<RecordKey>>(&self, key: K) -> Result<(), StoreError> {
        let key = key.into();
        self.execute(R::COLLECTION, AccessMode::ReadWrite, move |mut handle| {
            Box::pin(async move { handle.delete_value(&key).await.map(Some) })
        })
        .await
    }

    /// Newest record whose indexed field equals `key`. `Ok(None)` when no
    /// record matches; an index the schema does not declare is an
    /// [`StoreError::Operation`].
    pub async fn get_by_index<R: Record, K: Into<RecordKey>>(
        &self,
        index: &str,
        key: K,
    ) -> Result<Option<R>, StoreError> {
        let schema = self.collection_schema(R::COLLECTION)?;
        let key_path = schema
            .index(index)
            .ok_or_else(|| {
                StoreError::Operation(format!(
                    "collection {} has no index {index}",
                    R::COLLECTION
                ))
            })?
            .key_path;
        let key = key.into();
        let payload = self
            .execute(R::COLLECTION, AccessMode::Read, move |mut handle| {
                Box::pin(async move { handle.value_by_index(key_path, &key).await.map(Some) })
            })
            .await?;
        payload.map(|data| Self::decode(&data)).transpose()
    }

    /// Writes every record in one transaction. Either the whole batch
    /// becomes visible or, when the transaction aborts, none of it does.
    pub async fn bulk_put<R: Record>(&self, records: &[R]) -> Result<(), StoreError> {
        let schema = self.collection_schema(R::COLLECTION)?;
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let key = record.key();
            Self::check_key_kind(schema, key.as_ref())?;
            rows.push((key, Self::encode(record)?));
        }

        let pool = self.connect().await?;
        let mut tx = pool.begin().await.map_err(StoreError::BulkWrite)?;
        let mut handle = CollectionHandle {
            tx: &mut tx,
            schema,
            mode: AccessMode::ReadWrite,
        };
        for (key, payload) in rows {
            handle
                .put_value(key, &payload)
                .await
                .map_err(StoreError::BulkWrite)?;
        }
        tx.commit().await.map_err(StoreError::BulkWrite)
    }

    fn collection_schema(&self, name: &str) -> Result<&CollectionSchema, StoreError> {
        self.schema
            .collection(name)
            .ok_or_else(|| StoreError::Operation(format!("unknown collection: {name}")))
    }

    fn check_key_kind(
        schema: &CollectionSchema,
        key: Option<&RecordKey>,
    ) -> Result<(), StoreError> {
        match (schema.key, key) {
            (KeyKind::AutoIncrement, None | Some(RecordKey::Int(_))) => Ok(()),
            (KeyKind::Text, Some(RecordKey::Text(_))) => Ok(()),
            (kind, key) => Err(StoreError::Operation(format!(
                "key {key:?} does not fit collection {} ({kind:?})",
                schema.name
            ))),
        }
    }

    fn encode<R: Record>(record: &R) -> Result<String, StoreError> {
        serde_json::to_string(record)
            .map_err(|err| StoreError::Operation(format!("record encoding failed: {err}")))
    }

    fn decode<R: Record>(payload: &str) -> Result<R, StoreError> {
        serde_json::from_str(payload)
            .map_err(|err| StoreError::Operation(format!("record decoding failed: {err}")))
    }
}

/// Handle to one collection inside an open transaction.
pub struct CollectionHandle<'t> {
    tx: &'t mut Transaction<'static, Sqlite>,
    schema: &'t CollectionSchema,
    mode: AccessMode,
}

impl<'t> CollectionHandle<'t> {
    fn guard_write(&self) -> Result<(), sqlx::Error> {
        match self.mode {
            AccessMode::ReadWrite => Ok(()),
            AccessMode::Read => Err(sqlx::Error::Protocol(
                "write attempted in a read transaction".into(),
            )),
        }
    }

    /// Upserts one JSON payload, returning the key it landed under.
    pub async fn put_value(
        &mut self,
        key: Option<RecordKey>,
        payload: &str,
    ) -> Result<RecordKey, sqlx::Error> {
        self.guard_write()?;
        match key {
            None => {
                let insert = format!(
                    r#"INSERT INTO "{}" (data) VALUES (?1)"#,
                    self.schema.name
                );
                let done = sqlx::query(&insert)
                    .bind(payload)
                    .execute(&mut **self.tx)
                    .await?;
                let id = done.last_insert_rowid();
                // Write the assigned key back into the payload so the
                // record reads back with its id in place.
                let backfill = format!(
                    r#"UPDATE "{}" SET data = json_set(data, '$.{}', "key") WHERE "key" = ?1"#,
                    self.schema.name, self.schema.key_path
                );
                sqlx::query(&backfill)
                    .bind(id)
                    .execute(&mut **self.tx)
                    .await?;
                Ok(RecordKey::Int(id))
            }
            Some(RecordKey::Int(id)) => {
                let upsert = format!(
                    r#"INSERT INTO "{}" ("key", data) VALUES (?1, ?2)
                       ON CONFLICT("key") DO UPDATE SET data = excluded.data"#,
                    self.schema.name
                );
                sqlx::query(&upsert)
                    .bind(id)
                    .bind(payload)
                    .execute(&mut **self.tx)
                    .await?;
                Ok(RecordKey::Int(id))
            }
            Some(RecordKey::Text(id)) => {
                let upsert = format!(
                    r#"INSERT INTO "{}" ("key", data) VALUES (?1, ?2)
                       ON CONFLICT("key") DO UPDATE SET data = excluded.data"#,
                    self.schema.name
                );
                sqlx::query(&upsert)
                    .bind(id.as_str())
                    .bind(payload)
                    .execute(&mut **self.tx)
                    .await?;
                Ok(RecordKey::Text(id))
            }
        }
    }

    /// Fetches one payload by primary key.
    pub async fn get_value(&mut self, key: &RecordKey) -> Result<Option<String>, sqlx::Error> {
        let sql = format!(
            r#"SELECT data FROM "{}" WHERE "key" = ?1"#,
            self.schema.name
        );
        let data: Option<String> = match key {
            RecordKey::Int(id) => {
                sqlx::query_scalar(&sql)
                    .bind(*id)
                    .fetch_optional(&mut **self.tx)
                    .await?
            }
            RecordKey::Text(id) => {
                sqlx::query_scalar(&sql)
                    .bind(id.as_str())
                    .fetch_optional(&mut **self.tx)
                    .await?
            }
        };
        Ok(data)
    }

    /// Fetches every payload of the collection in key order.
    pub async fn all_values(&mut self) -> Result<Vec<String>, sqlx::Error> {
        let sql = format!(
            r#"SELECT data FROM "{}" ORDER BY "key""#,
            self.schema.name
        );
        sqlx::query_scalar(&sql).fetch_all(&mut **self.tx).await
    }

    /// Deletes one payload by primary key.
    pub async fn delete_value(&mut self, key: &RecordKey) -> Result<(), sqlx::Error> {
        self.guard_write()?;
        let sql = format!(
            r#"DELETE FROM "{}" WHERE "key" = ?1"#,
            self.schema.name
        );
        match key {
            RecordKey::Int(id) => {
                sqlx::query(&sql).bind(*id).execute(&mut **self.tx).await?;
            }
            RecordKey::Text(id) => {
                sqlx::query(&sql)
                    .bind(id.as_str())
                    .execute(&mut **self.tx)
                    .await?;
            }
        }
        Ok(())
    }

    /// Newest payload whose indexed field equals `key`.
    pub async fn value_by_index(
        &mut self,
        key_path: &str,
        key: &RecordKey,
    ) -> Result<Option<String>, sqlx::Error> {
        let sql = format!(
            r#"SELECT data FROM "{}" WHERE json_extract(data, '$.{}') = ?1
               ORDER BY "key" DESC LIMIT 1"#,
            self.schema.name, key_path
        );
        let data: Option<String> = match key {
            RecordKey::Int(id) => {
                sqlx::query_scalar(&sql)
                    .bind(*id)
                    .fetch_optional(&mut **self.tx)
                    .await?
            }
            RecordKey::Text(id) => {
                sqlx::query_scalar(&sql)
                    .bind(id.as_str())
                    .fetch_optional(&mut **self.tx)
                    .await?
            }
        };
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Candle, MarketDataRecord};
    use crate::storage::schema::trading_schema;

    fn record(symbol: &str, timestamp: i64) -> MarketDataRecord {
        MarketDataRecord::new(
            symbol,
            timestamp,
            vec![Candle::new("1700000000", 1.0, 2.0, 0.5, 1.5, Some(10.0))],
        )
    }

    #[tokio::test]
    async fn test_put_assigns_and_backfills_key() {
        let store = StoreManager::in_memory(trading_schema());

        let key = store.put(&record("AAPL", 1)).await.unwrap();
        assert_eq!(key, RecordKey::Int(1));

        let read: MarketDataRecord = store.get(1i64).await.unwrap().unwrap();
        assert_eq!(read.id, Some(1));
        assert_eq!(read.symbol, "AAPL");
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = StoreManager::in_memory(trading_schema());
        let read: Option<MarketDataRecord> = store.get(42i64).await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_index_lookup_returns_newest_match() {
        let store = StoreManager::in_memory(trading_schema());
        store.put(&record("AAPL", 1)).await.unwrap();
        store.put(&record("MSFT", 2)).await.unwrap();
        store.put(&record("AAPL", 3)).await.unwrap();

        let hit: MarketDataRecord = store
            .get_by_index("by_symbol", "AAPL")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.timestamp, 3);

        let miss: Option<MarketDataRecord> =
            store.get_by_index("by_symbol", "TSLA").await.unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_unknown_index_is_rejected() {
        let store = StoreManager::in_memory(trading_schema());
        let err = store
            .get_by_index::<MarketDataRecord, _>("by_close", "AAPL")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Operation(_)));
    }

    #[tokio::test]
    async fn test_bulk_put_writes_all_records() {
        let store = StoreManager::in_memory(trading_schema());
        let batch = vec![record("AAPL", 1), record("AAPL", 2), record("MSFT", 3)];
        store.bulk_put(&batch).await.unwrap();

        let all: Vec<MarketDataRecord> = store.get_all().await.unwrap();
        assert_eq!(all.len(), 3);
    }
}
