//! Directory-structured file share.

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by file share operations.
#[derive(Debug, Error)]
pub enum FileShareError {
    /// Directory or file name contains path separators or is empty.
    #[error("invalid file name: {0}")]
    InvalidName(String),

    /// No file under this directory/name.
    #[error("file {dir}/{name} not found")]
    NotFound { dir: String, name: String },

    #[error("file share I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file share could not be reached or rejected the call.
    #[error("file share unavailable: {0}")]
    Unavailable(String),
}

/// A single file share holding directories of small files.
///
/// Directories are created lazily on first write.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Write a file into a directory, creating the directory if needed.
    async fn write(&self, dir: &str, name: &str, contents: &[u8]) -> Result<(), FileShareError>;

    /// Read a file's contents.
    async fn read(&self, dir: &str, name: &str) -> Result<Vec<u8>, FileShareError>;

    /// List file names in a directory; absent directories list as empty.
    async fn list(&self, dir: &str) -> Result<Vec<String>, FileShareError>;
}
