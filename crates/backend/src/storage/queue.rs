//! At-least-once message queue for order processing.
//!
//! Delivery is at-least-once and not necessarily ordered across messages;
//! consumers must tolerate redelivery. A dequeued message is leased: it
//! becomes invisible for the lease duration and reappears unless acked.
//! Messages that keep failing are moved to the companion poison queue
//! (`{queue}-poison`) by the worker, never dropped silently.

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue service could not be reached or rejected the call.
    #[error("queue unavailable: {0}")]
    Unavailable(String),

    /// The backing database rejected or failed the operation.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A leased queue message.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub id: i64,
    /// UTF-8 message text.
    pub payload: String,
    /// Delivery count, including this delivery.
    pub attempts: u32,
}

/// Message queue contract used by the submission gateway and the worker.
#[async_trait]
pub trait OrderQueue: Send + Sync {
    /// Append a message, creating the backing queue if needed.
    async fn enqueue(&self, payload: &str) -> Result<(), QueueError>;

    /// Lease the next visible message, if any.
    async fn dequeue(&self) -> Result<Option<QueueMessage>, QueueError>;

    /// Remove a successfully processed message.
    async fn ack(&self, message: &QueueMessage) -> Result<(), QueueError>;

    /// Return a leased message to the queue for immediate redelivery.
    async fn release(&self, message: &QueueMessage) -> Result<(), QueueError>;

    /// Move a leased message to the poison queue.
    async fn dead_letter(&self, message: &QueueMessage) -> Result<(), QueueError>;
}

/// Name of the companion poison queue for a queue.
#[must_use]
pub fn poison_queue_name(queue: &str) -> String {
    format!("{queue}-poison")
}
