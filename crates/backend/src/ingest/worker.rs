//! Queue worker loop.
//!
//! The worker is the queue runtime: it leases messages, hands them to the
//! pipeline, and owns the disposition of failures. A failed message is
//! released for redelivery until it exhausts its attempts, then moved to
//! the poison queue. The pipeline handler itself never retries.

use std::sync::Arc;
use std::time::Duration;

use crate::storage::{EntityStore, OrderQueue, QueueError};

use super::process_message;

/// Outcome of a single worker tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOutcome {
    /// No message was visible.
    Idle,
    /// A message was processed and acked.
    Processed,
    /// A message failed and was released for redelivery.
    Retried,
    /// A message exhausted its attempts and was dead-lettered.
    Poisoned,
}

/// Background consumer of the order queue.
pub struct QueueWorker {
    store: Arc<dyn EntityStore>,
    queue: Arc<dyn OrderQueue>,
    max_attempts: u32,
    poll_interval: Duration,
}

impl QueueWorker {
    #[must_use]
    pub fn new(
        store: Arc<dyn EntityStore>,
        queue: Arc<dyn OrderQueue>,
        max_attempts: u32,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            queue,
            max_attempts,
            poll_interval,
        }
    }

    /// Lease and process at most one message.
    ///
    /// # Errors
    ///
    /// Returns `QueueError` only for queue transport failures; message
    /// processing failures are handled by the retry/dead-letter policy and
    /// reported through the returned [`WorkOutcome`].
    pub async fn tick(&self) -> Result<WorkOutcome, QueueError> {
        let Some(message) = self.queue.dequeue().await? else {
            return Ok(WorkOutcome::Idle);
        };

        match process_message(self.store.as_ref(), &message.payload).await {
            Ok(_) => {
                self.queue.ack(&message).await?;
                Ok(WorkOutcome::Processed)
            }
            Err(err) if message.attempts >= self.max_attempts => {
                tracing::error!(
                    error = %err,
                    attempts = message.attempts,
                    "message exhausted its attempts, moving to poison queue"
                );
                self.queue.dead_letter(&message).await?;
                Ok(WorkOutcome::Poisoned)
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    attempts = message.attempts,
                    "message processing failed, releasing for redelivery"
                );
                self.queue.release(&message).await?;
                Ok(WorkOutcome::Retried)
            }
        }
    }

    /// Tick until the queue reports no visible messages.
    ///
    /// Returns the number of messages processed successfully. Used by the
    /// test suites and by operational drains.
    ///
    /// # Errors
    ///
    /// Returns `QueueError` on queue transport failures.
    pub async fn drain(&self) -> Result<usize, QueueError> {
        let mut processed = 0;
        loop {
            match self.tick().await? {
                WorkOutcome::Idle => return Ok(processed),
                WorkOutcome::Processed => processed += 1,
                WorkOutcome::Retried | WorkOutcome::Poisoned => {}
            }
        }
    }

    /// Run forever, sleeping `poll_interval` between empty polls.
    pub async fn run(self) {
        tracing::info!(
            max_attempts = self.max_attempts,
            poll_interval_ms = self.poll_interval.as_millis(),
            "queue worker started"
        );
        loop {
            match self.tick().await {
                Ok(WorkOutcome::Idle) => tokio::time::sleep(self.poll_interval).await,
                Ok(_) => {}
                Err(err) => {
                    tracing::error!(error = %err, "queue worker tick failed");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use marigold_core::Collection;

    use super::*;
    use crate::storage::{MemoryEntityStore, MemoryOrderQueue};

    fn worker(
        store: &Arc<MemoryEntityStore>,
        queue: &Arc<MemoryOrderQueue>,
        max_attempts: u32,
    ) -> QueueWorker {
        QueueWorker::new(
            Arc::clone(store) as Arc<dyn EntityStore>,
            Arc::clone(queue) as Arc<dyn OrderQueue>,
            max_attempts,
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn test_tick_processes_and_acks() {
        let store = Arc::new(MemoryEntityStore::new());
        let queue = Arc::new(MemoryOrderQueue::new());
        queue
            .enqueue(r#"{"customerId":"C1","productId":"P1","quantity":2}"#)
            .await
            .expect("enqueue");

        let worker = worker(&store, &queue, 3);
        assert_eq!(worker.tick().await.expect("tick"), WorkOutcome::Processed);
        assert_eq!(worker.tick().await.expect("tick"), WorkOutcome::Idle);
        assert_eq!(store.len(Collection::Order), 1);
    }

    #[tokio::test]
    async fn test_poison_message_is_retried_then_dead_lettered() {
        let store = Arc::new(MemoryEntityStore::new());
        let queue = Arc::new(MemoryOrderQueue::new());
        queue.enqueue("not an order").await.expect("enqueue");

        let worker = worker(&store, &queue, 3);
        assert_eq!(worker.tick().await.expect("tick"), WorkOutcome::Retried);
        assert_eq!(worker.tick().await.expect("tick"), WorkOutcome::Retried);
        assert_eq!(worker.tick().await.expect("tick"), WorkOutcome::Poisoned);
        assert_eq!(worker.tick().await.expect("tick"), WorkOutcome::Idle);

        assert!(store.is_empty(Collection::Order));
        assert_eq!(queue.poisoned(), vec!["not an order".to_string()]);
    }

    #[tokio::test]
    async fn test_drain_counts_successes_only() {
        let store = Arc::new(MemoryEntityStore::new());
        let queue = Arc::new(MemoryOrderQueue::new());
        queue
            .enqueue(r#"{"customerId":"C1","productId":"P1","quantity":1}"#)
            .await
            .expect("enqueue");
        queue.enqueue("garbage").await.expect("enqueue");
        queue
            .enqueue(r#"{"customerId":"C2","productId":"P2","quantity":4}"#)
            .await
            .expect("enqueue");

        let worker = worker(&store, &queue, 1);
        let processed = worker.drain().await.expect("drain");

        assert_eq!(processed, 2);
        assert_eq!(store.len(Collection::Order), 2);
        assert_eq!(queue.poisoned().len(), 1);
    }
}
