//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::BackendConfig;
use crate::services::UploadService;
use crate::storage::{BlobStore, EntityStore, FileStore, OrderQueue};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The storage backends are held as trait
/// objects so the binary can wire the production backends while the test
/// suites wire the in-memory ones.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: BackendConfig,
    store: Arc<dyn EntityStore>,
    queue: Arc<dyn OrderQueue>,
    uploads: UploadService,
}

impl AppState {
    /// Create a new application state over the given storage backends.
    #[must_use]
    pub fn new(
        config: BackendConfig,
        store: Arc<dyn EntityStore>,
        queue: Arc<dyn OrderQueue>,
        blobs: Arc<dyn BlobStore>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        let uploads = UploadService::new(blobs, files, &config.storage);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                queue,
                uploads,
            }),
        }
    }

    /// Get a reference to the backend configuration.
    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.inner.config
    }

    /// Get a reference to the entity store.
    #[must_use]
    pub fn store(&self) -> &dyn EntityStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the order queue.
    #[must_use]
    pub fn queue(&self) -> &dyn OrderQueue {
        self.inner.queue.as_ref()
    }

    /// Get a reference to the upload coordination service.
    #[must_use]
    pub fn uploads(&self) -> &UploadService {
        &self.inner.uploads
    }
}
