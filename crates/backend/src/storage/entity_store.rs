//! Keyed durable store abstraction over named collections.
//!
//! The object-safe [`EntityStore`] trait speaks raw JSON documents wrapped
//! in the store envelope ([`StoredRecord`]); the blanket
//! [`EntityStoreExt`] extension adds the typed API the rest of the backend
//! uses ([`Stored`]`<Customer>` and friends).

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use marigold_core::{Collection, EntityKey, Record, Stored, StoredRecord, TokenMatch};

/// Errors surfaced by entity store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No record under this key.
    #[error("{0} not found")]
    NotFound(EntityKey),

    /// The presented concurrency token does not match the stored one.
    #[error("concurrency token mismatch for {0}")]
    ConcurrencyConflict(EntityKey),

    /// A record already exists under this key.
    #[error("{0} already exists")]
    AlreadyExists(EntityKey),

    /// A stored body does not deserialize into the requested record type.
    #[error("invalid stored body for {key}: {source}")]
    Corrupt {
        key: EntityKey,
        #[source]
        source: serde_json::Error,
    },

    /// An entity failed to serialize into a JSON body.
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The backing database rejected or failed the operation.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Keyed durable store over named collections of JSON documents.
///
/// Contract:
/// - the backing collection is created lazily on first use (idempotent
///   ensure-exists, safe to call on every operation);
/// - `insert` mints a unique id when none is supplied and assigns the
///   initial concurrency token;
/// - every successful write reassigns the token and the last-modified
///   timestamp;
/// - `update` enforces the optimistic lock unless the guard is the
///   wildcard [`TokenMatch::Any`]. The lock is never enforced on insert.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// List every record in a collection.
    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>, StorageError>;

    /// Fetch one record by key.
    async fn get(&self, key: &EntityKey) -> Result<StoredRecord, StorageError>;

    /// Insert a new record, minting an id when `id` is `None`.
    async fn insert(
        &self,
        collection: Collection,
        id: Option<String>,
        body: Value,
    ) -> Result<StoredRecord, StorageError>;

    /// Replace a record's body, guarded against the stored token.
    async fn update(
        &self,
        key: &EntityKey,
        body: Value,
        guard: TokenMatch,
    ) -> Result<StoredRecord, StorageError>;

    /// Delete by key; returns whether a record existed.
    async fn delete(&self, key: &EntityKey) -> Result<bool, StorageError>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), StorageError>;
}

/// Typed convenience layer over [`EntityStore`].
#[async_trait]
pub trait EntityStoreExt: EntityStore {
    /// List every entity in the record type's collection.
    async fn list_entities<E>(&self) -> Result<Vec<Stored<E>>, StorageError>
    where
        E: Record + 'static,
    {
        self.list(E::COLLECTION)
            .await?
            .into_iter()
            .map(into_typed::<E>)
            .collect()
    }

    /// Fetch one entity by id.
    async fn get_entity<E>(&self, id: &str) -> Result<Stored<E>, StorageError>
    where
        E: Record + 'static,
    {
        let record = self.get(&EntityKey::new(E::COLLECTION, id)).await?;
        into_typed(record)
    }

    /// Insert a new entity, letting the store mint its id.
    async fn create_entity<E>(&self, entity: &E) -> Result<Stored<E>, StorageError>
    where
        E: Record + 'static,
    {
        let body = serde_json::to_value(entity)?;
        let record = self.insert(E::COLLECTION, None, body).await?;
        into_typed(record)
    }

    /// Replace an entity's body under the given token guard.
    async fn update_entity<E>(
        &self,
        id: &str,
        entity: &E,
        guard: TokenMatch,
    ) -> Result<Stored<E>, StorageError>
    where
        E: Record + 'static,
    {
        let body = serde_json::to_value(entity)?;
        let record = self
            .update(&EntityKey::new(E::COLLECTION, id), body, guard)
            .await?;
        into_typed(record)
    }

    /// Delete an entity by id; returns whether it existed.
    async fn delete_entity<E>(&self, id: &str) -> Result<bool, StorageError>
    where
        E: Record + 'static,
    {
        self.delete(&EntityKey::new(E::COLLECTION, id)).await
    }
}

impl<S: EntityStore + ?Sized> EntityStoreExt for S {}

fn into_typed<E: Record>(record: StoredRecord) -> Result<Stored<E>, StorageError> {
    let key = record.key.clone();
    record
        .into_typed::<E>()
        .map_err(|source| StorageError::Corrupt { key, source })
}
