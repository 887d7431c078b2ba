//! Durable at-least-once task queue.
//!
//! A received message stays invisible to other consumers until it is
//! acknowledged or its visibility timeout lapses, after which it is
//! delivered again. Consumers must therefore tolerate redelivery.

use async_trait::async_trait;

use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The backend could not be reached.
    #[error("Queue unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected the operation.
    #[error("Queue operation failed: {0}")]
    Backend(String),
}

/// One message to put on a named queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub queue: String,
    pub body: String,
}

/// A message handed to one consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub id: DbId,
    /// Changes on every delivery; only the latest receipt can acknowledge.
    pub receipt_handle: String,
    pub body: String,
    /// How many times this message has been handed out, this one included.
    pub receive_count: i32,
}

#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Append one message to `queue`, returning its id.
    async fn enqueue(&self, queue: &str, body: String) -> Result<DbId, QueueError>;

    /// Append several messages.
    ///
    /// The default enqueues one at a time and stops at the first failure,
    /// so earlier messages stay queued. Backends that can commit the whole
    /// batch atomically override this.
    async fn enqueue_batch(&self, messages: Vec<OutgoingMessage>) -> Result<Vec<DbId>, QueueError> {
        let mut ids = Vec::with_capacity(messages.len());
        for message in messages {
            ids.push(self.enqueue(&message.queue, message.body).await?);
        }
        Ok(ids)
    }

    /// Claim the next visible message on `queue`, if any.
    async fn receive(&self, queue: &str) -> Result<Option<ReceivedMessage>, QueueError>;

    /// Delete a received message. Returns `false` when the receipt is stale
    /// (the message was redelivered to someone else, or already deleted).
    async fn ack(&self, message: &ReceivedMessage) -> Result<bool, QueueError>;
}
