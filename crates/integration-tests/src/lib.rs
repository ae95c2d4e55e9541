//! Integration tests for Marigold.
//!
//! The suites drive the real router, pipeline, and upload coordinator over
//! the in-memory storage backends, so they run without external services.
//!
//! # Test Categories
//!
//! - `order_pipeline` - submission gateway, queue ingestion, worker policy
//! - `upload_coordinator` - dual-write ordering and metadata round trips
//! - `entity_store` - CRUD surface and optimistic locking

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode, header};
use secrecy::SecretString;
use tower::ServiceExt;

use marigold_backend::config::{BackendConfig, QueuePolicy, StorageNames};
use marigold_backend::ingest::QueueWorker;
use marigold_backend::routes;
use marigold_backend::state::AppState;
use marigold_backend::storage::{
    BlobStore, EntityStore, FileStore, MemoryBlobStore, MemoryEntityStore, MemoryFileStore,
    MemoryOrderQueue, OrderQueue,
};

/// Attempts a message gets before dead-lettering in the test worker.
pub const TEST_MAX_ATTEMPTS: u32 = 3;

/// A full application wired over in-memory backends.
pub struct TestContext {
    pub state: AppState,
    pub store: Arc<MemoryEntityStore>,
    pub queue: Arc<MemoryOrderQueue>,
    pub blobs: Arc<MemoryBlobStore>,
    pub files: Arc<MemoryFileStore>,
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(MemoryEntityStore::new());
        let queue = Arc::new(MemoryOrderQueue::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let files = Arc::new(MemoryFileStore::new());

        let state = AppState::new(
            test_config(),
            Arc::clone(&store) as Arc<dyn EntityStore>,
            Arc::clone(&queue) as Arc<dyn OrderQueue>,
            Arc::clone(&blobs) as Arc<dyn BlobStore>,
            Arc::clone(&files) as Arc<dyn FileStore>,
        );

        Self {
            state,
            store,
            queue,
            blobs,
            files,
        }
    }

    /// The full route tree with this context's state applied.
    #[must_use]
    pub fn router(&self) -> Router {
        routes::routes().with_state(self.state.clone())
    }

    /// A worker over this context's store and queue.
    #[must_use]
    pub fn worker(&self) -> QueueWorker {
        QueueWorker::new(
            Arc::clone(&self.store) as Arc<dyn EntityStore>,
            Arc::clone(&self.queue) as Arc<dyn OrderQueue>,
            TEST_MAX_ATTEMPTS,
            Duration::from_millis(10),
        )
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration equivalent to the documented defaults, minus the
/// environment.
#[must_use]
pub fn test_config() -> BackendConfig {
    BackendConfig {
        database_url: SecretString::from("postgres://unused-in-tests"),
        host: IpAddr::from([127, 0, 0, 1]),
        port: 3000,
        base_url: "http://127.0.0.1:3000".to_string(),
        storage_root: PathBuf::from("./data"),
        storage: StorageNames {
            customers_table: "customers".to_string(),
            products_table: "products".to_string(),
            orders_table: "orders".to_string(),
            order_queue: "orderprocessing".to_string(),
            product_images_container: "productimages".to_string(),
            payment_proofs_container: "payment-proofs".to_string(),
            file_share: "contracts".to_string(),
            payments_dir: "payments".to_string(),
        },
        queue: QueuePolicy {
            max_attempts: TEST_MAX_ATTEMPTS,
            poll_interval: Duration::from_millis(10),
            visibility_lease: Duration::from_secs(30),
        },
        sentry_dsn: None,
    }
}

/// Send one request through a router and collect the response.
///
/// # Panics
///
/// Panics if the router fails or the body cannot be collected (test-only
/// helper).
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = router.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("collect body");
    (status, body)
}

/// Build a JSON request.
///
/// # Panics
///
/// Panics on an invalid method or URI (test-only helper).
#[must_use]
pub fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request")
}

/// Build a bodiless request (GET/DELETE).
///
/// # Panics
///
/// Panics on an invalid method or URI (test-only helper).
#[must_use]
pub fn bare_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

/// Parse a JSON response body.
///
/// # Panics
///
/// Panics if the body is not valid JSON (test-only helper).
#[must_use]
pub fn parse_json(body: &Bytes) -> serde_json::Value {
    serde_json::from_slice(body).expect("valid JSON body")
}
