//! Request path: mint a job id and fan the job out onto the task queues.

use std::sync::Arc;

use prodgen_core::error::CoreError;
use prodgen_core::kind::ArtifactKind;
use prodgen_core::queue::{OutgoingMessage, QueueError, TaskQueue};
use prodgen_core::task::{Task, TaskInput};
use prodgen_core::types::{DbId, JobId};

use crate::config::QueueRoutes;

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// Bad request data, or a missing queue setting.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Failed to encode task: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// A job whose tasks are all on their queues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedJob {
    pub job_id: JobId,
    pub kinds: Vec<ArtifactKind>,
}

pub struct JobSubmitter {
    queue: Arc<dyn TaskQueue>,
    routes: QueueRoutes,
}

impl JobSubmitter {
    pub fn new(queue: Arc<dyn TaskQueue>, routes: QueueRoutes) -> Self {
        Self { queue, routes }
    }

    /// Enqueue one task per input under a freshly minted job id.
    ///
    /// Inputs are validated and every queue name is resolved before the
    /// first message is sent. Report-only jobs get a `report_` id. On any
    /// error no job id is returned; whether earlier messages of the batch
    /// stay queued depends on the queue's `enqueue_batch`.
    pub async fn submit(
        &self,
        user_id: DbId,
        inputs: Vec<TaskInput>,
    ) -> Result<SubmittedJob, SubmitError> {
        if inputs.is_empty() {
            return Err(CoreError::Validation("At least one artifact kind must be requested".into()).into());
        }
        if user_id <= 0 {
            return Err(CoreError::Validation("user_id must be a positive integer".into()).into());
        }

        let job_id = if inputs.iter().all(|input| input.kind() == ArtifactKind::Report) {
            JobId::generate_report()
        } else {
            JobId::generate()
        };

        let mut kinds = Vec::with_capacity(inputs.len());
        let mut messages = Vec::with_capacity(inputs.len());
        for input in inputs {
            let kind = input.kind();
            if kinds.contains(&kind) {
                return Err(CoreError::Validation(format!("Kind '{kind}' requested more than once")).into());
            }
            input.validate().map_err(CoreError::from)?;
            let queue = self.routes.queue_for(kind)?.to_string();
            let body = Task::new(job_id.clone(), user_id, input).encode()?;
            kinds.push(kind);
            messages.push(OutgoingMessage { queue, body });
        }

        let message_ids = self.queue.enqueue_batch(messages).await.map_err(|e| {
            tracing::error!(job_id = %job_id, kinds = ?kinds, error = %e, "Failed to enqueue job");
            e
        })?;

        tracing::info!(
            job_id = %job_id,
            user_id,
            kinds = ?kinds,
            message_ids = ?message_ids,
            "Job submitted",
        );

        Ok(SubmittedJob { job_id, kinds })
    }
}
