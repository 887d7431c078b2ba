//! In-process implementations of the storage traits.
//!
//! They keep the same observable semantics as the PostgreSQL versions
//! (visibility timeouts, stale receipts, first-write-wins results) so the
//! pipeline can be driven end to end without a database.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use prodgen_core::artifact::{ArtifactError, ArtifactStore, StoredArtifact};
use prodgen_core::kind::ArtifactKind;
use prodgen_core::queue::{OutgoingMessage, QueueError, ReceivedMessage, TaskQueue};
use prodgen_core::repository::{RepositoryError, ResultRepository};
use prodgen_core::result::{NewResult, StoredResult, UpsertOutcome};
use prodgen_core::types::{DbId, JobId};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::queue::DEFAULT_VISIBILITY_TIMEOUT;

// ---------------------------------------------------------------------------
// Task queue
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct QueuedMessage {
    id: DbId,
    queue: String,
    body: String,
    receipt: Option<String>,
    locked_until: Option<Instant>,
    receive_count: i32,
}

impl QueuedMessage {
    fn is_visible(&self, now: Instant) -> bool {
        self.locked_until.map_or(true, |until| until <= now)
    }
}

#[derive(Debug, Default)]
struct QueueState {
    next_id: DbId,
    messages: Vec<QueuedMessage>,
}

impl QueueState {
    fn push(&mut self, queue: String, body: String) -> DbId {
        self.next_id += 1;
        self.messages.push(QueuedMessage {
            id: self.next_id,
            queue,
            body,
            receipt: None,
            locked_until: None,
            receive_count: 0,
        });
        self.next_id
    }
}

/// FIFO queue per name with visibility timeouts, held in memory.
#[derive(Debug)]
pub struct InMemoryTaskQueue {
    state: Mutex<QueueState>,
    visibility_timeout: Duration,
}

impl InMemoryTaskQueue {
    pub fn new() -> Self {
        Self::with_visibility_timeout(DEFAULT_VISIBILITY_TIMEOUT)
    }

    pub fn with_visibility_timeout(visibility_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            visibility_timeout,
        }
    }

    /// Bodies of every message on `queue`, in flight or not, oldest first.
    pub async fn bodies(&self, queue: &str) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .messages
            .iter()
            .filter(|m| m.queue == queue)
            .map(|m| m.body.clone())
            .collect()
    }

    /// Total number of messages across all queues.
    pub async fn len(&self) -> usize {
        self.state.lock().await.messages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, queue: &str, body: String) -> Result<DbId, QueueError> {
        Ok(self.state.lock().await.push(queue.to_string(), body))
    }

    async fn enqueue_batch(&self, messages: Vec<OutgoingMessage>) -> Result<Vec<DbId>, QueueError> {
        let mut state = self.state.lock().await;
        Ok(messages
            .into_iter()
            .map(|m| state.push(m.queue, m.body))
            .collect())
    }

    async fn receive(&self, queue: &str) -> Result<Option<ReceivedMessage>, QueueError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        let Some(message) = state
            .messages
            .iter_mut()
            .find(|m| m.queue == queue && m.is_visible(now))
        else {
            return Ok(None);
        };

        let receipt = uuid::Uuid::new_v4().to_string();
        message.receipt = Some(receipt.clone());
        message.locked_until = Some(now + self.visibility_timeout);
        message.receive_count += 1;

        Ok(Some(ReceivedMessage {
            id: message.id,
            receipt_handle: receipt,
            body: message.body.clone(),
            receive_count: message.receive_count,
        }))
    }

    async fn ack(&self, message: &ReceivedMessage) -> Result<bool, QueueError> {
        let mut state = self.state.lock().await;
        let before = state.messages.len();
        state.messages.retain(|m| {
            !(m.id == message.id && m.receipt.as_deref() == Some(message.receipt_handle.as_str()))
        });
        Ok(state.messages.len() < before)
    }
}

// ---------------------------------------------------------------------------
// Result repository
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryResultRepository {
    results: Mutex<HashMap<(JobId, ArtifactKind), StoredResult>>,
}

impl InMemoryResultRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.results.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ResultRepository for InMemoryResultRepository {
    async fn upsert(&self, result: NewResult) -> Result<UpsertOutcome, RepositoryError> {
        let mut results = self.results.lock().await;
        let key = (result.job_id.clone(), result.kind);
        if results.contains_key(&key) {
            return Ok(UpsertOutcome::AlreadyPresent);
        }
        results.insert(
            key,
            StoredResult {
                job_id: result.job_id,
                kind: result.kind,
                user_id: result.user_id,
                payload: result.payload,
                created_at: chrono::Utc::now(),
            },
        );
        Ok(UpsertOutcome::Inserted)
    }

    async fn find(
        &self,
        job_id: &JobId,
        kind: ArtifactKind,
    ) -> Result<Option<StoredResult>, RepositoryError> {
        let results = self.results.lock().await;
        Ok(results.get(&(job_id.clone(), kind)).cloned())
    }

    async fn list_for_job(&self, job_id: &JobId) -> Result<Vec<StoredResult>, RepositoryError> {
        let results = self.results.lock().await;
        let mut found: Vec<StoredResult> = results
            .values()
            .filter(|r| &r.job_id == job_id)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at);
        Ok(found)
    }
}

// ---------------------------------------------------------------------------
// Artifact store
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct InMemoryArtifactStore {
    public_base_url: String,
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryArtifactStore {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<StoredArtifact, ArtifactError> {
        if bytes.is_empty() {
            return Err(ArtifactError::Empty);
        }
        self.objects.lock().await.insert(key.to_string(), bytes);
        Ok(StoredArtifact {
            key: key.to_string(),
            url: format!("{}/{key}", self.public_base_url.trim_end_matches('/')),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn receive_is_fifo_per_queue() {
        let queue = InMemoryTaskQueue::new();
        queue.enqueue("text", "a".into()).await.unwrap();
        queue.enqueue("image", "b".into()).await.unwrap();
        queue.enqueue("text", "c".into()).await.unwrap();

        let first = queue.receive("text").await.unwrap().unwrap();
        let second = queue.receive("text").await.unwrap().unwrap();
        assert_eq!(first.body, "a");
        assert_eq!(second.body, "c");
        assert!(queue.receive("text").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ack_removes_message() {
        let queue = InMemoryTaskQueue::new();
        queue.enqueue("text", "a".into()).await.unwrap();
        let received = queue.receive("text").await.unwrap().unwrap();
        assert!(queue.ack(&received).await.unwrap());
        assert!(queue.is_empty().await);
        assert!(!queue.ack(&received).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn unacked_message_is_redelivered_after_visibility_timeout() {
        let queue = InMemoryTaskQueue::with_visibility_timeout(Duration::from_secs(30));
        queue.enqueue("text", "a".into()).await.unwrap();

        let first = queue.receive("text").await.unwrap().unwrap();
        assert!(queue.receive("text").await.unwrap().is_none());

        tokio::time::advance(Duration::from_secs(31)).await;

        let second = queue.receive("text").await.unwrap().unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.receive_count, 2);
        assert_ne!(second.receipt_handle, first.receipt_handle);

        // The stale receipt can no longer delete the message.
        assert!(!queue.ack(&first).await.unwrap());
        assert!(queue.ack(&second).await.unwrap());
    }

    #[tokio::test]
    async fn batch_enqueue_assigns_increasing_ids() {
        let queue = InMemoryTaskQueue::new();
        let ids = queue
            .enqueue_batch(vec![
                OutgoingMessage { queue: "text".into(), body: "a".into() },
                OutgoingMessage { queue: "image".into(), body: "b".into() },
            ])
            .await
            .unwrap();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(queue.bodies("image").await, vec!["b".to_string()]);
    }

    fn new_result(payload: serde_json::Value) -> NewResult {
        NewResult {
            job_id: JobId::from("job-1"),
            kind: ArtifactKind::Text,
            user_id: 7,
            payload,
        }
    }

    #[tokio::test]
    async fn upsert_keeps_first_write() {
        let repo = InMemoryResultRepository::new();
        let first = repo.upsert(new_result(serde_json::json!({"v": 1}))).await.unwrap();
        let second = repo.upsert(new_result(serde_json::json!({"v": 2}))).await.unwrap();

        assert_eq!(first, UpsertOutcome::Inserted);
        assert_eq!(second, UpsertOutcome::AlreadyPresent);
        assert_eq!(repo.len().await, 1);

        let stored = repo
            .find(&JobId::from("job-1"), ArtifactKind::Text)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payload["v"], 1);
    }

    #[tokio::test]
    async fn list_for_job_filters_by_job() {
        let repo = InMemoryResultRepository::new();
        repo.upsert(new_result(serde_json::json!({}))).await.unwrap();
        repo.upsert(NewResult {
            job_id: JobId::from("job-2"),
            ..new_result(serde_json::json!({}))
        })
        .await
        .unwrap();

        let listed = repo.list_for_job(&JobId::from("job-1")).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].job_id.as_str(), "job-1");
    }

    #[tokio::test]
    async fn artifact_store_builds_public_url() {
        let store = InMemoryArtifactStore::new("http://localhost:3000/artifacts/");
        let stored = store.put("7/image_ab.png", b"png".to_vec()).await.unwrap();
        assert_eq!(stored.url, "http://localhost:3000/artifacts/7/image_ab.png");
        assert_eq!(store.get("7/image_ab.png").await.unwrap(), b"png");
        assert_matches!(store.put("x", Vec::new()).await, Err(ArtifactError::Empty));
    }
}
