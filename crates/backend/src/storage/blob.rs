//! Blob container store.

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by blob operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// Container or blob name contains path separators or is empty.
    #[error("invalid blob name: {0}")]
    InvalidName(String),

    /// No blob under this container/name.
    #[error("blob {container}/{name} not found")]
    NotFound { container: String, name: String },

    #[error("blob store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blob service could not be reached or rejected the call.
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}

/// Store of named binary blobs grouped into containers.
///
/// Containers are created lazily on first write. `put` returns the blob's
/// resolved public URL, which is what gets embedded in entity bodies and
/// upload metadata records.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write a blob, creating the container if needed; returns the blob's
    /// resolved URL.
    async fn put(&self, container: &str, name: &str, content: &[u8]) -> Result<String, BlobError>;

    /// Read a blob's content.
    async fn fetch(&self, container: &str, name: &str) -> Result<Vec<u8>, BlobError>;
}
