//! Repository for the `task_queue` table.

use std::time::Duration;

use prodgen_core::types::DbId;
use sqlx::PgPool;

use crate::models::task_queue::QueueMessage;

/// Column list for `task_queue` queries.
const COLUMNS: &str = "\
    id, queue_name, body, enqueued_at, receipt_handle, locked_until, receive_count";

/// Provides enqueue, claim and acknowledge operations on the task queue.
pub struct TaskQueueRepo;

impl TaskQueueRepo {
    /// Append one message. Returns the new message id.
    pub async fn enqueue(pool: &PgPool, queue_name: &str, body: &str) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO task_queue (queue_name, body) VALUES ($1, $2) RETURNING id",
        )
        .bind(queue_name)
        .bind(body)
        .fetch_one(pool)
        .await
    }

    /// Append several `(queue_name, body)` messages in one transaction.
    ///
    /// Either every message is committed or none is.
    pub async fn enqueue_many(
        pool: &PgPool,
        messages: &[(String, String)],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut ids = Vec::with_capacity(messages.len());

        for (queue_name, body) in messages {
            let id = sqlx::query_scalar::<_, DbId>(
                "INSERT INTO task_queue (queue_name, body) VALUES ($1, $2) RETURNING id",
            )
            .bind(queue_name)
            .bind(body)
            .fetch_one(&mut *tx)
            .await?;
            ids.push(id);
        }

        tx.commit().await?;
        Ok(ids)
    }

    /// Atomically claim the oldest visible message on `queue_name`.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent consumers never
    /// claim the same row. The claimed row gets a fresh receipt and stays
    /// invisible for `visibility_timeout`.
    pub async fn claim_next(
        pool: &PgPool,
        queue_name: &str,
        visibility_timeout: Duration,
    ) -> Result<Option<QueueMessage>, sqlx::Error> {
        let query = format!(
            "UPDATE task_queue \
             SET receipt_handle = $2, \
                 locked_until = NOW() + make_interval(secs => $3), \
                 receive_count = receive_count + 1 \
             WHERE id = ( \
                 SELECT id FROM task_queue \
                 WHERE queue_name = $1 \
                   AND (locked_until IS NULL OR locked_until < NOW()) \
                 ORDER BY id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueueMessage>(&query)
            .bind(queue_name)
            .bind(uuid::Uuid::new_v4())
            .bind(visibility_timeout.as_secs_f64())
            .fetch_optional(pool)
            .await
    }

    /// Delete a claimed message if `receipt` is still its current receipt.
    ///
    /// Returns `true` if a row was deleted.
    pub async fn delete_claimed(
        pool: &PgPool,
        id: DbId,
        receipt: uuid::Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_queue WHERE id = $1 AND receipt_handle = $2")
            .bind(id)
            .bind(receipt)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Number of messages on `queue_name`, in flight or not.
    pub async fn count(pool: &PgPool, queue_name: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM task_queue WHERE queue_name = $1")
            .bind(queue_name)
            .fetch_one(pool)
            .await
    }
}
