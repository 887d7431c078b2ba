use prodgen_core::queue::ReceivedMessage;
use prodgen_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `task_queue` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueueMessage {
    pub id: DbId,
    pub queue_name: String,
    pub body: String,
    pub enqueued_at: Timestamp,
    pub receipt_handle: Option<uuid::Uuid>,
    pub locked_until: Option<Timestamp>,
    pub receive_count: i32,
}

impl QueueMessage {
    /// Convert a freshly claimed row into the consumer-facing message.
    ///
    /// Only rows returned by a claim carry a receipt; an unclaimed row
    /// yields an empty receipt that can never acknowledge anything.
    pub fn into_received(self) -> ReceivedMessage {
        ReceivedMessage {
            id: self.id,
            receipt_handle: self
                .receipt_handle
                .map(|r| r.to_string())
                .unwrap_or_default(),
            body: self.body,
            receive_count: self.receive_count,
        }
    }
}
