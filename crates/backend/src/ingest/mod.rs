//! Queue ingestion pipeline: order messages → persisted order entities.
//!
//! Per message the steps are strictly sequential: decode (canonical shape
//! first, submission shape as fallback), normalize, persist. The pipeline
//! performs no retries of its own: a failure propagates to the worker
//! loop, which owns the redelivery and dead-letter policy. Because every
//! ingestion mints a fresh order id, redelivering the same message
//! produces a duplicate order rather than overwriting one; that is the
//! accepted at-least-once tradeoff.

pub mod worker;

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use marigold_core::Order;
use marigold_core::Stored;
use marigold_core::message::{MessageDecodeError, OrderMessage};

use crate::storage::{EntityStore, EntityStoreExt, StorageError};

pub use worker::{QueueWorker, WorkOutcome};

/// Failure while materializing a queue message into an order.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Poison message: neither shape decoded.
    #[error(transparent)]
    Decode(#[from] MessageDecodeError),

    /// The entity store rejected or failed the insert.
    #[error(transparent)]
    Store(#[from] StorageError),
}

/// Process one raw queue message into a stored order.
///
/// # Errors
///
/// Returns [`IngestError::Decode`] for poison messages and
/// [`IngestError::Store`] when persistence fails; both are raised to the
/// caller so the queue runtime can apply its retry/dead-letter policy.
#[instrument(skip_all, fields(message_bytes = raw.len()))]
pub async fn process_message(
    store: &dyn EntityStore,
    raw: &str,
) -> Result<Stored<Order>, IngestError> {
    let message = match OrderMessage::decode(raw) {
        Ok(message) => message,
        Err(err) => {
            tracing::error!(error = %err, "failed to decode queue message into any known shape");
            return Err(err.into());
        }
    };

    let shape = message.shape();
    let order = message.normalize(Utc::now());
    let stored = store.create_entity(&order).await?;

    tracing::info!(
        order_id = %stored.id,
        shape,
        customer_id = %stored.entity.customer_id,
        "order persisted from queue message"
    );
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use marigold_core::{Collection, OrderStatus};

    use super::*;
    use crate::storage::MemoryEntityStore;

    #[tokio::test]
    async fn test_submission_message_becomes_processed_order() {
        let store = MemoryEntityStore::new();
        let raw = r#"{"customerId":"C1","productId":"P1","quantity":3,"details":"gift wrap"}"#;

        let stored = process_message(&store, raw).await.expect("process");

        assert_eq!(stored.entity.quantity, 3);
        assert_eq!(stored.entity.status, OrderStatus::Processed);
        assert_eq!(store.len(Collection::Order), 1);
    }

    #[tokio::test]
    async fn test_canonical_message_gets_fresh_id() {
        let store = MemoryEntityStore::new();
        let raw = r#"{
            "id": "original-id",
            "customerId": "C1",
            "productId": "P1",
            "quantity": 1,
            "orderDate": "2020-01-01T00:00:00Z"
        }"#;

        let stored = process_message(&store, raw).await.expect("process");

        assert_ne!(stored.id, "original-id");
        // The original submission time is not preserved on this path.
        let submitted: chrono::DateTime<Utc> = "2020-01-02T00:00:00Z".parse().expect("timestamp");
        assert!(stored.entity.order_date > submitted);
    }

    #[tokio::test]
    async fn test_poison_message_writes_nothing() {
        let store = MemoryEntityStore::new();

        let err = process_message(&store, r#"{"unrelated":true}"#)
            .await
            .expect_err("poison");

        assert!(matches!(err, IngestError::Decode(_)));
        assert!(store.is_empty(Collection::Order));
    }
}
