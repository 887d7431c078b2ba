//! Queue consumer loop.
//!
//! One consumer handles one message at a time: receive, decode, process,
//! acknowledge. A message is acknowledged once processing reached a final
//! outcome (delivered, exhausted or aborted) or when it can never be
//! processed (undecodable, wrong kind). Only an interrupted task is left
//! unacknowledged so the queue hands it out again after its visibility
//! timeout.

use std::sync::Arc;
use std::time::Duration;

use prodgen_core::kind::ArtifactKind;
use prodgen_core::queue::{QueueError, ReceivedMessage, TaskQueue};
use prodgen_core::task::Task;
use prodgen_pipeline::{TaskOutcome, TaskProcessor};
use tokio_util::sync::CancellationToken;

/// What one [`QueueConsumer::run_once`] call did.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumeOutcome {
    /// The queue was empty.
    Idle,
    Processed(TaskOutcome),
    /// The message could never be processed and was discarded.
    Dropped,
    /// Shutdown interrupted processing; the message stays on the queue.
    Interrupted,
}

pub struct QueueConsumer {
    queue: Arc<dyn TaskQueue>,
    queue_name: String,
    kind: ArtifactKind,
    processor: Arc<TaskProcessor>,
    idle_interval: Duration,
}

impl QueueConsumer {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        queue_name: impl Into<String>,
        kind: ArtifactKind,
        processor: Arc<TaskProcessor>,
        idle_interval: Duration,
    ) -> Self {
        Self {
            queue,
            queue_name: queue_name.into(),
            kind,
            processor,
            idle_interval,
        }
    }

    /// Run the consumer loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            queue = %self.queue_name,
            kind = self.kind.as_str(),
            "Queue consumer started",
        );

        while !cancel.is_cancelled() {
            let pause = match self.run_once(&cancel).await {
                Ok(ConsumeOutcome::Idle) => true,
                Ok(ConsumeOutcome::Interrupted) => break,
                Ok(_) => false,
                Err(e) => {
                    tracing::error!(queue = %self.queue_name, error = %e, "Queue receive failed");
                    true
                }
            };

            if pause {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.idle_interval) => {}
                }
            }
        }

        tracing::info!(queue = %self.queue_name, "Queue consumer shutting down");
    }

    /// Receive and handle at most one message.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<ConsumeOutcome, QueueError> {
        let Some(message) = self.queue.receive(&self.queue_name).await? else {
            return Ok(ConsumeOutcome::Idle);
        };

        if message.receive_count > 1 {
            tracing::info!(
                queue = %self.queue_name,
                message_id = message.id,
                receive_count = message.receive_count,
                "Processing redelivered message",
            );
        }

        let task = match Task::decode(&message.body) {
            Ok(task) => task,
            Err(e) => {
                tracing::warn!(
                    queue = %self.queue_name,
                    message_id = message.id,
                    error = %e,
                    "Dropping undecodable task message",
                );
                self.ack(&message).await?;
                return Ok(ConsumeOutcome::Dropped);
            }
        };

        if task.kind() != self.kind {
            tracing::warn!(
                queue = %self.queue_name,
                message_id = message.id,
                job_id = %task.job_id,
                expected = self.kind.as_str(),
                actual = task.kind().as_str(),
                "Dropping task of the wrong kind",
            );
            self.ack(&message).await?;
            return Ok(ConsumeOutcome::Dropped);
        }

        tracing::info!(
            job_id = %task.job_id,
            kind = self.kind.as_str(),
            user_id = task.user_id,
            "Task received",
        );

        let outcome = self.processor.process(&task, cancel).await;
        if outcome == TaskOutcome::Interrupted {
            tracing::info!(
                job_id = %task.job_id,
                kind = self.kind.as_str(),
                "Task interrupted, leaving message for redelivery",
            );
            return Ok(ConsumeOutcome::Interrupted);
        }

        self.ack(&message).await?;
        tracing::info!(
            job_id = %task.job_id,
            kind = self.kind.as_str(),
            outcome = ?outcome,
            "Task finished",
        );
        Ok(ConsumeOutcome::Processed(outcome))
    }

    async fn ack(&self, message: &ReceivedMessage) -> Result<(), QueueError> {
        if !self.queue.ack(message).await? {
            tracing::warn!(
                queue = %self.queue_name,
                message_id = message.id,
                "Ack ignored, receipt is stale (message was redelivered)",
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use prodgen_core::envelope::CallbackEnvelope;
    use prodgen_core::task::{ImageTaskInput, TaskInput, TextTaskInput};
    use prodgen_core::types::JobId;
    use prodgen_db::memory::InMemoryTaskQueue;
    use prodgen_engine::{EngineError, InferenceEngine, PendingHandle, StatusResponse, SubmitOutcome};
    use prodgen_events::{CallbackError, CallbackSink};
    use prodgen_pipeline::{AbortReason, PassthroughTranslator, PollPolicies};

    use super::*;

    struct InlineEngine {
        fail: bool,
    }

    #[async_trait]
    impl InferenceEngine for InlineEngine {
        async fn submit(
            &self,
            _kind: ArtifactKind,
            _input: &serde_json::Value,
        ) -> Result<SubmitOutcome, EngineError> {
            if self.fail {
                return Err(EngineError::UnexpectedResponse("no".into()));
            }
            Ok(SubmitOutcome::Immediate(serde_json::json!({"description": "설명"})))
        }

        async fn poll(&self, _handle: &PendingHandle) -> Result<StatusResponse, EngineError> {
            Err(EngineError::UnexpectedResponse("inline engine is never polled".into()))
        }
    }

    #[derive(Default)]
    struct CountingSink {
        delivered: AtomicU32,
    }

    #[async_trait]
    impl CallbackSink for CountingSink {
        async fn deliver(&self, _envelope: &CallbackEnvelope) -> Result<u32, CallbackError> {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        }
    }

    fn consumer(queue: Arc<InMemoryTaskQueue>, sink: Arc<CountingSink>, engine_fails: bool) -> QueueConsumer {
        let processor = TaskProcessor::new(
            Arc::new(InlineEngine { fail: engine_fails }),
            Arc::new(PassthroughTranslator),
            sink,
            PollPolicies::default(),
        );
        QueueConsumer::new(
            queue,
            "text-tasks",
            ArtifactKind::Text,
            Arc::new(processor),
            Duration::from_millis(100),
        )
    }

    fn text_body() -> String {
        Task::new(
            JobId::from("job-1"),
            7,
            TaskInput::Text(TextTaskInput {
                product_name: "소보로빵".into(),
                category: "베이커리".into(),
                price: 3500,
                keywords: vec![],
                tone: "친근한".into(),
            }),
        )
        .encode()
        .unwrap()
    }

    #[tokio::test]
    async fn empty_queue_is_idle() {
        let queue = Arc::new(InMemoryTaskQueue::new());
        let outcome = consumer(queue, Arc::default(), false)
            .run_once(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, ConsumeOutcome::Idle);
    }

    #[tokio::test]
    async fn processed_message_is_acked() {
        let queue = Arc::new(InMemoryTaskQueue::new());
        queue.enqueue("text-tasks", text_body()).await.unwrap();
        let sink = Arc::new(CountingSink::default());

        let outcome = consumer(queue.clone(), sink.clone(), false)
            .run_once(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, ConsumeOutcome::Processed(TaskOutcome::Delivered { attempts: 1 }));
        assert_eq!(sink.delivered.load(Ordering::SeqCst), 1);
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn aborted_task_is_acked_without_callback() {
        let queue = Arc::new(InMemoryTaskQueue::new());
        queue.enqueue("text-tasks", text_body()).await.unwrap();
        let sink = Arc::new(CountingSink::default());

        let outcome = consumer(queue.clone(), sink.clone(), true)
            .run_once(&CancellationToken::new())
            .await
            .unwrap();

        assert_matches!(outcome, ConsumeOutcome::Processed(TaskOutcome::Aborted(AbortReason::Submit(_))));
        assert_eq!(sink.delivered.load(Ordering::SeqCst), 0);
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn malformed_message_is_dropped_and_acked() {
        let queue = Arc::new(InMemoryTaskQueue::new());
        queue.enqueue("text-tasks", "{not json".into()).await.unwrap();
        queue
            .enqueue("text-tasks", r#"{"kind":"text","user_id":1}"#.into())
            .await
            .unwrap();
        let consumer = consumer(queue.clone(), Arc::default(), false);

        for _ in 0..2 {
            let outcome = consumer.run_once(&CancellationToken::new()).await.unwrap();
            assert_eq!(outcome, ConsumeOutcome::Dropped);
        }
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn wrong_kind_is_dropped() {
        let queue = Arc::new(InMemoryTaskQueue::new());
        let body = Task::new(
            JobId::from("job-1"),
            7,
            TaskInput::Image(ImageTaskInput {
                product_name: "소보로빵".into(),
            }),
        )
        .encode()
        .unwrap();
        queue.enqueue("text-tasks", body).await.unwrap();
        let sink = Arc::new(CountingSink::default());

        let outcome = consumer(queue.clone(), sink.clone(), false)
            .run_once(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, ConsumeOutcome::Dropped);
        assert_eq!(sink.delivered.load(Ordering::SeqCst), 0);
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn interrupted_task_stays_queued() {
        let queue = Arc::new(InMemoryTaskQueue::new());
        queue.enqueue("text-tasks", text_body()).await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = consumer(queue.clone(), Arc::default(), false)
            .run_once(&cancel)
            .await
            .unwrap();

        assert_eq!(outcome, ConsumeOutcome::Interrupted);
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_drains_queue_and_stops_on_cancel() {
        let queue = Arc::new(InMemoryTaskQueue::new());
        queue.enqueue("text-tasks", text_body()).await.unwrap();
        queue.enqueue("text-tasks", text_body()).await.unwrap();
        let sink = Arc::new(CountingSink::default());
        let consumer = Arc::new(consumer(queue.clone(), sink.clone(), false));

        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let consumer = consumer.clone();
            let cancel = cancel.clone();
            async move { consumer.run(cancel).await }
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(sink.delivered.load(Ordering::SeqCst), 2);
        assert!(queue.is_empty().await);
    }
}
