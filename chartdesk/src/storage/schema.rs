//! Collection declarations and additive schema migration.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::StoreError;

/// Collection holding candle snapshots.
pub const MARKET_DATA: &str = "market_data";
/// Collection holding per-user preferences.
pub const USER_PREFERENCES: &str = "user_preferences";

/// Primary key strategy of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Integer key assigned by the store on insert.
    AutoIncrement,
    /// Caller-supplied string key.
    Text,
}

/// A secondary index over one field of the stored record.
#[derive(Debug, Clone)]
pub struct IndexSchema {
    pub name: &'static str,
    /// Record field the index is built over.
    pub key_path: &'static str,
}

/// One named collection: its primary key and secondary indices.
#[derive(Debug, Clone)]
pub struct CollectionSchema {
    pub name: &'static str,
    pub key: KeyKind,
    /// Record field holding the primary key.
    pub key_path: &'static str,
    pub indices: Vec<IndexSchema>,
}

impl CollectionSchema {
    pub fn index(&self, name: &str) -> Option<&IndexSchema> {
        self.indices.iter().find(|index| index.name == name)
    }
}

/// Process-wide description of the database: name, version, collections.
///
/// Every collection the repository touches must appear here, and every
/// index a lookup names must be declared on its collection. Schema changes
/// require a version bump.
#[derive(Debug, Clone)]
pub struct DatabaseSchema {
    pub name: &'static str,
    pub version: i32,
    pub collections: Vec<CollectionSchema>,
}

impl DatabaseSchema {
    pub fn collection(&self, name: &str) -> Option<&CollectionSchema> {
        self.collections.iter().find(|c| c.name == name)
    }
}

/// The schema used by the trading dashboard.
pub fn trading_schema() -> DatabaseSchema {
    DatabaseSchema {
        name: "trading-app",
        version: 2,
        collections: vec![
            CollectionSchema {
                name: MARKET_DATA,
                key: KeyKind::AutoIncrement,
                key_path: "id",
                indices: vec![
                    IndexSchema {
                        name: "by_symbol",
                        key_path: "symbol",
                    },
                    IndexSchema {
                        name: "by_timestamp",
                        key_path: "timestamp",
                    },
                ],
            },
            CollectionSchema {
                name: USER_PREFERENCES,
                key: KeyKind::Text,
                key_path: "userId",
                indices: vec![IndexSchema {
                    name: "by_theme",
                    key_path: "theme",
                }],
            },
        ],
    }
}

/// Applies additive migrations when the declared version is newer than the
/// one recorded in the database.
pub struct SchemaRegistry<'a> {
    schema: &'a DatabaseSchema,
}

impl<'a> SchemaRegistry<'a> {
    pub fn new(schema: &'a DatabaseSchema) -> Self {
        Self { schema }
    }

    /// Creates missing collections and indices inside one transaction, then
    /// records the new version. Existing collections and indices are left
    /// untouched; nothing is ever dropped or renamed. A stored version at or
    /// above the declared one makes this a no-op.
    pub async fn apply(&self, pool: &SqlitePool) -> Result<(), StoreError> {
        let mut tx = pool.begin().await.map_err(StoreError::Connection)?;

        let stored: i32 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&mut *tx)
            .await
            .map_err(StoreError::Connection)?;
        if stored >= self.schema.version {
            return Ok(());
        }

        info!(
            database = self.schema.name,
            from = stored,
            to = self.schema.version,
            "upgrading store schema"
        );

        for collection in &self.schema.collections {
            let key_column = match collection.key {
                KeyKind::AutoIncrement => r#""key" INTEGER PRIMARY KEY AUTOINCREMENT"#,
                KeyKind::Text => r#""key" TEXT PRIMARY KEY"#,
            };
            let ddl = format!(
                r#"CREATE TABLE IF NOT EXISTS "{}" ({}, data TEXT NOT NULL)"#,
                collection.name, key_column
            );
            sqlx::query(&ddl)
                .execute(&mut *tx)
                .await
                .map_err(StoreError::Connection)?;

            for index in &collection.indices {
                let ddl = format!(
                    r#"CREATE INDEX IF NOT EXISTS "{}_{}" ON "{}" (json_extract(data, '$.{}'))"#,
                    collection.name, index.name, collection.name, index.key_path
                );
                sqlx::query(&ddl)
                    .execute(&mut *tx)
                    .await
                    .map_err(StoreError::Connection)?;
            }
        }

        let pragma = format!("PRAGMA user_version = {}", self.schema.version);
        sqlx::query(&pragma)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::Connection)?;

        tx.commit().await.map_err(StoreError::Connection)
    }
}
