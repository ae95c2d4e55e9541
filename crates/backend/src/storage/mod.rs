//! Storage backends: entity store, order queue, blob store, and file share.
//!
//! Each backing service is a small object-safe async trait so the HTTP
//! surface, the ingestion worker, and the upload coordinator can be driven
//! against either the production backends (`PostgreSQL` for entities and the
//! queue, the local filesystem for blobs and file shares) or the in-memory
//! backends used by the test suites.
//!
//! All backends lazily create their backing collection, container, or
//! directory on first use; the ensure-exists step is idempotent and safe to
//! repeat on every operation.

pub mod blob;
pub mod entity_store;
pub mod files;
pub mod fs;
pub mod memory;
pub mod postgres;
pub mod queue;

pub use blob::{BlobError, BlobStore};
pub use entity_store::{EntityStore, EntityStoreExt, StorageError};
pub use files::{FileShareError, FileStore};
pub use fs::{FsBlobStore, FsFileStore};
pub use memory::{MemoryBlobStore, MemoryEntityStore, MemoryFileStore, MemoryOrderQueue};
pub use postgres::{PgEntityStore, PgOrderQueue, TableNames, create_pool};
pub use queue::{OrderQueue, QueueError, QueueMessage, poison_queue_name};
