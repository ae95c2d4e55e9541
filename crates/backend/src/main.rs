//! Marigold Backend - retail order-management service.
//!
//! This binary serves the HTTP API and runs the order-ingestion worker.
//!
//! # Architecture
//!
//! - Axum web framework for the API surface
//! - `PostgreSQL` for the entity store and the order queue
//! - Local filesystem for blob containers and the file share, served
//!   statically under `/blobs` so resolved blob URLs dereference
//! - A background worker task consuming the order queue
//!
//! Each HTTP request and each queue message is handled by an independent
//! runtime-managed task; no component keeps shared mutable state across
//! invocations beyond the store handles in `AppState`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::get};
use sentry::integrations::tracing as sentry_tracing;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marigold_backend::config::BackendConfig;
use marigold_backend::ingest::QueueWorker;
use marigold_backend::routes;
use marigold_backend::state::AppState;
use marigold_backend::storage::{
    BlobStore, EntityStore, FileStore, FsBlobStore, FsFileStore, OrderQueue, PgEntityStore,
    PgOrderQueue, TableNames, create_pool,
};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &BackendConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = BackendConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Initialize tracing with EnvFilter and Sentry integration
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "marigold_backend=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // Initialize database connection pool
    let pool = create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    // Wire the production storage backends. Collections, queues,
    // containers, and directories are created lazily on first use.
    let store: Arc<dyn EntityStore> = Arc::new(PgEntityStore::new(
        pool.clone(),
        TableNames::from(&config.storage),
    ));
    let queue: Arc<dyn OrderQueue> = Arc::new(PgOrderQueue::new(
        pool,
        config.storage.order_queue.clone(),
        config.queue.visibility_lease,
    ));
    let blobs: Arc<dyn BlobStore> = Arc::new(
        FsBlobStore::new(config.blob_root(), &config.blob_base_url())
            .expect("Invalid blob base URL"),
    );
    let files: Arc<dyn FileStore> = Arc::new(FsFileStore::new(config.share_root()));

    // Start the order-ingestion worker
    let worker = QueueWorker::new(
        Arc::clone(&store),
        Arc::clone(&queue),
        config.queue.max_attempts,
        config.queue.poll_interval,
    );
    tokio::spawn(worker.run());

    // Build application state
    let blob_root = config.blob_root();
    let state = AppState::new(config.clone(), store, queue, blobs, files);

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service("/blobs", ServeDir::new(blob_root))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    // Start server
    let addr = config.socket_addr();
    tracing::info!("backend listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies entity store connectivity before returning OK.
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
