//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers should return
//! `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::UploadError;
use crate::storage::{QueueError, StorageError};

/// Application-level error type for the backend.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing required request fields.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entity store operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Queue operation failed.
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Upload coordination failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture upstream/internal failures to Sentry; client errors and
        // key misses are not error events.
        if is_server_error(&self) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(err) => match err {
                StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                StorageError::ConcurrencyConflict(_) | StorageError::AlreadyExists(_) => {
                    StatusCode::CONFLICT
                }
                _ => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::Queue(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upload(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Validation(msg) | Self::NotFound(msg) | Self::Internal(msg) => msg.clone(),
            Self::Storage(err) => match err {
                StorageError::NotFound(key) => format!("{key} not found"),
                StorageError::ConcurrencyConflict(key) => {
                    format!("{key} was modified concurrently")
                }
                StorageError::AlreadyExists(key) => format!("{key} already exists"),
                _ => "Storage unavailable".to_string(),
            },
            Self::Queue(_) => "Queue unavailable".to_string(),
            Self::Upload(_) => "Upload failed".to_string(),
        };

        (status, message).into_response()
    }
}

const fn is_server_error(error: &AppError) -> bool {
    match error {
        AppError::Validation(_) | AppError::NotFound(_) => false,
        AppError::Storage(err) => !matches!(
            err,
            StorageError::NotFound(_)
                | StorageError::ConcurrencyConflict(_)
                | StorageError::AlreadyExists(_)
        ),
        AppError::Queue(_) | AppError::Upload(_) | AppError::Internal(_) => true,
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use marigold_core::{Collection, EntityKey};

    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_of(AppError::Validation("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::NotFound("order".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let key = EntityKey::new(Collection::Order, "o1");
        assert_eq!(
            status_of(AppError::Storage(StorageError::NotFound(key.clone()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Storage(StorageError::ConcurrencyConflict(key))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Queue(QueueError::Unavailable("down".to_string()))),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_key_misses_are_not_sentry_events() {
        let key = EntityKey::new(Collection::Customer, "c1");
        assert!(!is_server_error(&AppError::Storage(StorageError::NotFound(
            key
        ))));
        assert!(!is_server_error(&AppError::Validation("bad".to_string())));
        assert!(is_server_error(&AppError::Queue(QueueError::Unavailable(
            "down".to_string()
        ))));
    }
}
