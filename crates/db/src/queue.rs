//! [`TaskQueue`] backed by the `task_queue` table.

use std::time::Duration;

use async_trait::async_trait;
use prodgen_core::queue::{OutgoingMessage, QueueError, ReceivedMessage, TaskQueue};
use prodgen_core::types::DbId;

use crate::repositories::TaskQueueRepo;
use crate::DbPool;

/// Default time a received message stays invisible before redelivery.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(3600);

#[derive(Clone)]
pub struct PgTaskQueue {
    pool: DbPool,
    visibility_timeout: Duration,
}

impl PgTaskQueue {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        }
    }

    /// Override how long a received message stays invisible.
    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }
}

/// Whether the error means the database could not be reached at all.
pub(crate) fn is_unavailable(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_)
    )
}

fn queue_error(err: sqlx::Error) -> QueueError {
    if is_unavailable(&err) {
        QueueError::Unavailable(err.to_string())
    } else {
        QueueError::Backend(err.to_string())
    }
}

#[async_trait]
impl TaskQueue for PgTaskQueue {
    async fn enqueue(&self, queue: &str, body: String) -> Result<DbId, QueueError> {
        TaskQueueRepo::enqueue(&self.pool, queue, &body)
            .await
            .map_err(queue_error)
    }

    async fn enqueue_batch(&self, messages: Vec<OutgoingMessage>) -> Result<Vec<DbId>, QueueError> {
        let pairs: Vec<(String, String)> = messages.into_iter().map(|m| (m.queue, m.body)).collect();
        TaskQueueRepo::enqueue_many(&self.pool, &pairs)
            .await
            .map_err(queue_error)
    }

    async fn receive(&self, queue: &str) -> Result<Option<ReceivedMessage>, QueueError> {
        let claimed = TaskQueueRepo::claim_next(&self.pool, queue, self.visibility_timeout)
            .await
            .map_err(queue_error)?;
        Ok(claimed.map(|row| row.into_received()))
    }

    async fn ack(&self, message: &ReceivedMessage) -> Result<bool, QueueError> {
        let Ok(receipt) = message.receipt_handle.parse::<uuid::Uuid>() else {
            tracing::warn!(message_id = message.id, "Ack with unparseable receipt handle ignored");
            return Ok(false);
        };
        TaskQueueRepo::delete_claimed(&self.pool, message.id, receipt)
            .await
            .map_err(queue_error)
    }
}
