//! Filesystem implementations of the blob store and the file share.
//!
//! Blobs live under `<root>/<container>/<name>` and resolve to URLs under
//! the service's public `/blobs` mount (the binary serves the blob root
//! statically, so returned URLs dereference). The file share is a plain
//! directory tree under its own root.

use std::path::PathBuf;

use async_trait::async_trait;
use url::Url;

use super::blob::{BlobError, BlobStore};
use super::files::{FileShareError, FileStore};

/// A single path segment: no separators, no traversal, not empty.
fn safe_segment(value: &str) -> Result<&str, String> {
    if value.is_empty() {
        return Err("name must not be empty".to_string());
    }
    if value == "." || value == ".." || value.contains(['/', '\\']) || value.contains('\0') {
        return Err(format!("'{value}' is not a valid name"));
    }
    Ok(value)
}

/// Blob store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    base_url: Url,
}

impl FsBlobStore {
    /// Create a store rooted at `root`, resolving blob URLs under
    /// `base_url` (e.g. `http://127.0.0.1:3000/blobs`).
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if `base_url` is not a valid URL.
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Result<Self, url::ParseError> {
        // A trailing slash makes Url::join append instead of replace.
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        Ok(Self {
            root: root.into(),
            base_url,
        })
    }

    fn blob_path(&self, container: &str, name: &str) -> Result<PathBuf, BlobError> {
        let container = safe_segment(container).map_err(BlobError::InvalidName)?;
        let name = safe_segment(name).map_err(BlobError::InvalidName)?;
        Ok(self.root.join(container).join(name))
    }

    fn blob_url(&self, container: &str, name: &str) -> Result<String, BlobError> {
        self.base_url
            .join(&format!("{container}/{name}"))
            .map(String::from)
            .map_err(|e| BlobError::InvalidName(e.to_string()))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, container: &str, name: &str, content: &[u8]) -> Result<String, BlobError> {
        let path = self.blob_path(container, name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        self.blob_url(container, name)
    }

    async fn fetch(&self, container: &str, name: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.blob_path(container, name)?;
        match tokio::fs::read(&path).await {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(BlobError::NotFound {
                container: container.to_string(),
                name: name.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }
}

/// File share rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsFileStore {
    root: PathBuf,
}

impl FsFileStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn dir_path(&self, dir: &str) -> Result<PathBuf, FileShareError> {
        if dir.is_empty() {
            return Ok(self.root.clone());
        }
        let dir = safe_segment(dir).map_err(FileShareError::InvalidName)?;
        Ok(self.root.join(dir))
    }

    fn file_path(&self, dir: &str, name: &str) -> Result<PathBuf, FileShareError> {
        let name = safe_segment(name).map_err(FileShareError::InvalidName)?;
        Ok(self.dir_path(dir)?.join(name))
    }
}

#[async_trait]
impl FileStore for FsFileStore {
    async fn write(&self, dir: &str, name: &str, contents: &[u8]) -> Result<(), FileShareError> {
        let path = self.file_path(dir, name)?;
        tokio::fs::create_dir_all(self.dir_path(dir)?).await?;
        tokio::fs::write(&path, contents).await?;
        Ok(())
    }

    async fn read(&self, dir: &str, name: &str) -> Result<Vec<u8>, FileShareError> {
        let path = self.file_path(dir, name)?;
        match tokio::fs::read(&path).await {
            Ok(contents) => Ok(contents),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(FileShareError::NotFound {
                    dir: dir.to_string(),
                    name: name.to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self, dir: &str) -> Result<Vec<String>, FileShareError> {
        let path = self.dir_path(dir)?;
        let mut entries = match tokio::fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}
