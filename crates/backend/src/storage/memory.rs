//! In-memory implementations of the storage traits.
//!
//! Used by the test suites and for local development without external
//! services. The queue, blob, and file stores expose failure injection so
//! the dual-write ordering and retry paths can be exercised
//! deterministically.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use marigold_core::{Collection, ConcurrencyToken, EntityKey, StoredRecord, TokenMatch};

use super::blob::{BlobError, BlobStore};
use super::entity_store::{EntityStore, StorageError};
use super::files::{FileShareError, FileStore};
use super::queue::{OrderQueue, QueueError, QueueMessage};

fn lock<'a, T>(mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[derive(Debug, Clone)]
struct MemoryRecord {
    body: Value,
    token: ConcurrencyToken,
    updated_at: chrono::DateTime<Utc>,
}

/// Entity store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    collections: Mutex<HashMap<Collection, BTreeMap<String, MemoryRecord>>>,
}

impl MemoryEntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a collection.
    #[must_use]
    pub fn len(&self, collection: Collection) -> usize {
        lock(&self.collections)
            .get(&collection)
            .map_or(0, BTreeMap::len)
    }

    /// Whether a collection holds no records.
    #[must_use]
    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>, StorageError> {
        let mut collections = lock(&self.collections);
        let records = collections.entry(collection).or_default();
        Ok(records
            .iter()
            .map(|(id, record)| StoredRecord {
                key: EntityKey::new(collection, id.clone()),
                body: record.body.clone(),
                token: record.token,
                updated_at: record.updated_at,
            })
            .collect())
    }

    async fn get(&self, key: &EntityKey) -> Result<StoredRecord, StorageError> {
        let mut collections = lock(&self.collections);
        let records = collections.entry(key.collection).or_default();
        records
            .get(&key.id)
            .map(|record| StoredRecord {
                key: key.clone(),
                body: record.body.clone(),
                token: record.token,
                updated_at: record.updated_at,
            })
            .ok_or_else(|| StorageError::NotFound(key.clone()))
    }

    async fn insert(
        &self,
        collection: Collection,
        id: Option<String>,
        body: Value,
    ) -> Result<StoredRecord, StorageError> {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let key = EntityKey::new(collection, id.clone());

        let mut collections = lock(&self.collections);
        let records = collections.entry(collection).or_default();
        if records.contains_key(&id) {
            return Err(StorageError::AlreadyExists(key));
        }

        let record = MemoryRecord {
            body: body.clone(),
            token: ConcurrencyToken::mint(),
            updated_at: Utc::now(),
        };
        let stored = StoredRecord {
            key,
            body,
            token: record.token,
            updated_at: record.updated_at,
        };
        records.insert(id, record);
        Ok(stored)
    }

    async fn update(
        &self,
        key: &EntityKey,
        body: Value,
        guard: TokenMatch,
    ) -> Result<StoredRecord, StorageError> {
        let mut collections = lock(&self.collections);
        let records = collections.entry(key.collection).or_default();
        let record = records
            .get_mut(&key.id)
            .ok_or_else(|| StorageError::NotFound(key.clone()))?;

        if !guard.accepts(record.token) {
            return Err(StorageError::ConcurrencyConflict(key.clone()));
        }

        record.body = body.clone();
        record.token = ConcurrencyToken::mint();
        record.updated_at = Utc::now();
        Ok(StoredRecord {
            key: key.clone(),
            body,
            token: record.token,
            updated_at: record.updated_at,
        })
    }

    async fn delete(&self, key: &EntityKey) -> Result<bool, StorageError> {
        let mut collections = lock(&self.collections);
        let records = collections.entry(key.collection).or_default();
        Ok(records.remove(&key.id).is_some())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryQueueState {
    next_id: i64,
    ready: VecDeque<QueueMessage>,
    leased: HashMap<i64, QueueMessage>,
    poison: Vec<String>,
}

/// Order queue held in process memory.
///
/// Leases have no timeout here: an unacked message stays leased until
/// `release` or `dead_letter`, which is what the worker always does.
#[derive(Debug, Default)]
pub struct MemoryOrderQueue {
    state: Mutex<MemoryQueueState>,
    fail_enqueue: AtomicBool,
}

impl MemoryOrderQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `enqueue` calls fail, to exercise the gateway's
    /// unavailable path.
    pub fn set_enqueue_failing(&self, failing: bool) {
        self.fail_enqueue.store(failing, Ordering::SeqCst);
    }

    /// Number of messages ready for delivery.
    #[must_use]
    pub fn ready_len(&self) -> usize {
        lock(&self.state).ready.len()
    }

    /// Payloads moved to the poison queue.
    #[must_use]
    pub fn poisoned(&self) -> Vec<String> {
        lock(&self.state).poison.clone()
    }
}

#[async_trait]
impl OrderQueue for MemoryOrderQueue {
    async fn enqueue(&self, payload: &str) -> Result<(), QueueError> {
        if self.fail_enqueue.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable("injected enqueue failure".to_string()));
        }
        let mut state = lock(&self.state);
        state.next_id += 1;
        let id = state.next_id;
        state.ready.push_back(QueueMessage {
            id,
            payload: payload.to_string(),
            attempts: 0,
        });
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<QueueMessage>, QueueError> {
        let mut state = lock(&self.state);
        let Some(mut message) = state.ready.pop_front() else {
            return Ok(None);
        };
        message.attempts += 1;
        state.leased.insert(message.id, message.clone());
        Ok(Some(message))
    }

    async fn ack(&self, message: &QueueMessage) -> Result<(), QueueError> {
        lock(&self.state).leased.remove(&message.id);
        Ok(())
    }

    async fn release(&self, message: &QueueMessage) -> Result<(), QueueError> {
        let mut state = lock(&self.state);
        if let Some(message) = state.leased.remove(&message.id) {
            state.ready.push_back(message);
        }
        Ok(())
    }

    async fn dead_letter(&self, message: &QueueMessage) -> Result<(), QueueError> {
        let mut state = lock(&self.state);
        if let Some(message) = state.leased.remove(&message.id) {
            state.poison.push(message.payload);
        }
        Ok(())
    }
}

/// Blob store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<(String, String), Vec<u8>>>,
    failing: AtomicBool,
}

const MEMORY_BLOB_BASE_URL: &str = "memory://blobs";

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `put` calls fail, to exercise the dual-write
    /// ordering invariant.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Resolve a URL previously returned by `put` back to its content.
    #[must_use]
    pub fn fetch_url(&self, url: &str) -> Option<Vec<u8>> {
        let rest = url.strip_prefix(MEMORY_BLOB_BASE_URL)?.strip_prefix('/')?;
        let (container, name) = rest.split_once('/')?;
        lock(&self.blobs)
            .get(&(container.to_string(), name.to_string()))
            .cloned()
    }

    /// Number of stored blobs across all containers.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.blobs).len()
    }

    /// Whether the store holds no blobs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, container: &str, name: &str, content: &[u8]) -> Result<String, BlobError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BlobError::Unavailable("injected blob failure".to_string()));
        }
        lock(&self.blobs).insert(
            (container.to_string(), name.to_string()),
            content.to_vec(),
        );
        Ok(format!("{MEMORY_BLOB_BASE_URL}/{container}/{name}"))
    }

    async fn fetch(&self, container: &str, name: &str) -> Result<Vec<u8>, BlobError> {
        lock(&self.blobs)
            .get(&(container.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| BlobError::NotFound {
                container: container.to_string(),
                name: name.to_string(),
            })
    }
}

/// File share held in process memory.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    files: Mutex<HashMap<(String, String), Vec<u8>>>,
    failing: AtomicBool,
}

impl MemoryFileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `write` calls fail, to exercise the partial
    /// dual-write path (blob written, metadata failed).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of stored files across all directories.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.files).len()
    }

    /// Whether the share holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn write(&self, dir: &str, name: &str, contents: &[u8]) -> Result<(), FileShareError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FileShareError::Unavailable(
                "injected file share failure".to_string(),
            ));
        }
        lock(&self.files).insert((dir.to_string(), name.to_string()), contents.to_vec());
        Ok(())
    }

    async fn read(&self, dir: &str, name: &str) -> Result<Vec<u8>, FileShareError> {
        lock(&self.files)
            .get(&(dir.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| FileShareError::NotFound {
                dir: dir.to_string(),
                name: name.to_string(),
            })
    }

    async fn list(&self, dir: &str) -> Result<Vec<String>, FileShareError> {
        let mut names: Vec<String> = lock(&self.files)
            .keys()
            .filter(|(d, _)| d == dir)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}
