//! `PostgreSQL` implementations of the entity store and the order queue.
//!
//! Entities live in one table per collection (`collection`, `id`,
//! `body jsonb`, `token uuid`, `updated_at timestamptz`, primary key on
//! `(collection, id)`). Queue messages share a single `queue_message`
//! table keyed by queue name, dequeued with `FOR UPDATE SKIP LOCKED` and a
//! visibility lease so concurrent workers never double-lease a message.
//!
//! Table names come from configuration and are validated there to a safe
//! identifier character set; all values are bound, never interpolated.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use marigold_core::{Collection, ConcurrencyToken, EntityKey, StoredRecord, TokenMatch};

use super::entity_store::{EntityStore, StorageError};
use super::queue::{OrderQueue, QueueError, QueueMessage, poison_queue_name};
use crate::config::StorageNames;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Per-collection table names for the entity store.
#[derive(Debug, Clone)]
pub struct TableNames {
    customers: String,
    products: String,
    orders: String,
}

impl TableNames {
    fn table(&self, collection: Collection) -> &str {
        match collection {
            Collection::Customer => &self.customers,
            Collection::Product => &self.products,
            Collection::Order => &self.orders,
        }
    }
}

impl From<&StorageNames> for TableNames {
    fn from(names: &StorageNames) -> Self {
        Self {
            customers: names.customers_table.clone(),
            products: names.products_table.clone(),
            orders: names.orders_table.clone(),
        }
    }
}

/// Entity store backed by `PostgreSQL` JSONB documents.
#[derive(Clone)]
pub struct PgEntityStore {
    pool: PgPool,
    tables: TableNames,
}

impl PgEntityStore {
    #[must_use]
    pub const fn new(pool: PgPool, tables: TableNames) -> Self {
        Self { pool, tables }
    }

    /// Idempotently create the backing table for a collection.
    ///
    /// Called on every operation, mirroring the ensure-exists contract.
    async fn ensure(&self, collection: Collection) -> Result<(), StorageError> {
        let table = self.tables.table(collection);
        let ddl = format!(
            r#"CREATE TABLE IF NOT EXISTS "{table}" (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body JSONB NOT NULL,
                token UUID NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (collection, id)
            )"#
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }
}

fn row_to_record(collection: Collection, row: &PgRow) -> Result<StoredRecord, StorageError> {
    let id: String = row.try_get("id")?;
    let body: Value = row.try_get("body")?;
    let token: Uuid = row.try_get("token")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
    Ok(StoredRecord {
        key: EntityKey::new(collection, id),
        body,
        token: token.into(),
        updated_at,
    })
}

#[async_trait]
impl EntityStore for PgEntityStore {
    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>, StorageError> {
        self.ensure(collection).await?;
        let table = self.tables.table(collection);
        let sql = format!(r#"SELECT id, body, token, updated_at FROM "{table}" WHERE collection = $1"#);
        let rows = sqlx::query(&sql)
            .bind(collection.tag())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|row| row_to_record(collection, row)).collect()
    }

    async fn get(&self, key: &EntityKey) -> Result<StoredRecord, StorageError> {
        self.ensure(key.collection).await?;
        let table = self.tables.table(key.collection);
        let sql = format!(
            r#"SELECT id, body, token, updated_at FROM "{table}" WHERE collection = $1 AND id = $2"#
        );
        let row = sqlx::query(&sql)
            .bind(key.collection.tag())
            .bind(&key.id)
            .fetch_optional(&self.pool)
            .await?;
        row.map_or_else(
            || Err(StorageError::NotFound(key.clone())),
            |row| row_to_record(key.collection, &row),
        )
    }

    async fn insert(
        &self,
        collection: Collection,
        id: Option<String>,
        body: Value,
    ) -> Result<StoredRecord, StorageError> {
        self.ensure(collection).await?;
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let token = ConcurrencyToken::mint();
        let table = self.tables.table(collection);
        let sql = format!(
            r#"INSERT INTO "{table}" (collection, id, body, token)
               VALUES ($1, $2, $3, $4)
               RETURNING updated_at"#
        );
        let result = sqlx::query(&sql)
            .bind(collection.tag())
            .bind(&id)
            .bind(&body)
            .bind(token.as_uuid())
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => Ok(StoredRecord {
                key: EntityKey::new(collection, id),
                body,
                token,
                updated_at: row.try_get("updated_at")?,
            }),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StorageError::AlreadyExists(EntityKey::new(collection, id)))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update(
        &self,
        key: &EntityKey,
        body: Value,
        guard: TokenMatch,
    ) -> Result<StoredRecord, StorageError> {
        self.ensure(key.collection).await?;
        let token = ConcurrencyToken::mint();
        let table = self.tables.table(key.collection);

        let row = match guard {
            TokenMatch::Any => {
                let sql = format!(
                    r#"UPDATE "{table}" SET body = $3, token = $4, updated_at = now()
                       WHERE collection = $1 AND id = $2
                       RETURNING updated_at"#
                );
                sqlx::query(&sql)
                    .bind(key.collection.tag())
                    .bind(&key.id)
                    .bind(&body)
                    .bind(token.as_uuid())
                    .fetch_optional(&self.pool)
                    .await?
            }
            TokenMatch::Exact(expected) => {
                let sql = format!(
                    r#"UPDATE "{table}" SET body = $3, token = $4, updated_at = now()
                       WHERE collection = $1 AND id = $2 AND token = $5
                       RETURNING updated_at"#
                );
                sqlx::query(&sql)
                    .bind(key.collection.tag())
                    .bind(&key.id)
                    .bind(&body)
                    .bind(token.as_uuid())
                    .bind(expected.as_uuid())
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        match row {
            Some(row) => Ok(StoredRecord {
                key: key.clone(),
                body,
                token,
                updated_at: row.try_get("updated_at")?,
            }),
            // Zero rows: either the key is absent or the token is stale.
            None => match self.get(key).await {
                Ok(_) => Err(StorageError::ConcurrencyConflict(key.clone())),
                Err(err) => Err(err),
            },
        }
    }

    async fn delete(&self, key: &EntityKey) -> Result<bool, StorageError> {
        self.ensure(key.collection).await?;
        let table = self.tables.table(key.collection);
        let sql = format!(r#"DELETE FROM "{table}" WHERE collection = $1 AND id = $2"#);
        let result = sqlx::query(&sql)
            .bind(key.collection.tag())
            .bind(&key.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

const QUEUE_TABLE_DDL: &str = r"CREATE TABLE IF NOT EXISTS queue_message (
    id BIGSERIAL PRIMARY KEY,
    queue TEXT NOT NULL,
    payload TEXT NOT NULL,
    attempts INT NOT NULL DEFAULT 0,
    visible_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    enqueued_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

const QUEUE_INDEX_DDL: &str =
    "CREATE INDEX IF NOT EXISTS queue_message_ready_idx ON queue_message (queue, visible_at)";

/// Order queue backed by a `PostgreSQL` table.
#[derive(Clone)]
pub struct PgOrderQueue {
    pool: PgPool,
    queue: String,
    visibility_lease: Duration,
}

impl PgOrderQueue {
    #[must_use]
    pub const fn new(pool: PgPool, queue: String, visibility_lease: Duration) -> Self {
        Self {
            pool,
            queue,
            visibility_lease,
        }
    }

    async fn ensure(&self) -> Result<(), QueueError> {
        sqlx::query(QUEUE_TABLE_DDL).execute(&self.pool).await?;
        sqlx::query(QUEUE_INDEX_DDL).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl OrderQueue for PgOrderQueue {
    async fn enqueue(&self, payload: &str) -> Result<(), QueueError> {
        self.ensure().await?;
        sqlx::query("INSERT INTO queue_message (queue, payload) VALUES ($1, $2)")
            .bind(&self.queue)
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<QueueMessage>, QueueError> {
        self.ensure().await?;
        let row = sqlx::query(
            r"UPDATE queue_message
              SET attempts = attempts + 1, visible_at = now() + make_interval(secs => $2)
              WHERE id = (
                  SELECT id FROM queue_message
                  WHERE queue = $1 AND visible_at <= now()
                  ORDER BY id
                  LIMIT 1
                  FOR UPDATE SKIP LOCKED
              )
              RETURNING id, payload, attempts",
        )
        .bind(&self.queue)
        .bind(self.visibility_lease.as_secs_f64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(None),
            Some(row) => {
                let attempts: i32 = row.try_get("attempts")?;
                Ok(Some(QueueMessage {
                    id: row.try_get("id")?,
                    payload: row.try_get("payload")?,
                    attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
                }))
            }
        }
    }

    async fn ack(&self, message: &QueueMessage) -> Result<(), QueueError> {
        sqlx::query("DELETE FROM queue_message WHERE id = $1")
            .bind(message.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn release(&self, message: &QueueMessage) -> Result<(), QueueError> {
        sqlx::query("UPDATE queue_message SET visible_at = now() WHERE id = $1")
            .bind(message.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn dead_letter(&self, message: &QueueMessage) -> Result<(), QueueError> {
        sqlx::query(
            r"WITH moved AS (DELETE FROM queue_message WHERE id = $1 RETURNING payload)
              INSERT INTO queue_message (queue, payload)
              SELECT $2, payload FROM moved",
        )
        .bind(message.id)
        .bind(poison_queue_name(&self.queue))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
