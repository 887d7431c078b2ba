use async_trait::async_trait;

use crate::kind::ArtifactKind;
use crate::result::{NewResult, StoredResult, UpsertOutcome};
use crate::types::JobId;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Result storage unavailable: {0}")]
    Unavailable(String),

    #[error("Result storage error: {0}")]
    Backend(String),
}

/// Idempotent store of per-kind results, keyed by `(job_id, kind)`.
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Insert a result unless one already exists for its pair.
    ///
    /// First write wins: a later upsert for the same pair leaves the
    /// stored payload untouched and reports [`UpsertOutcome::AlreadyPresent`].
    async fn upsert(&self, result: NewResult) -> Result<UpsertOutcome, RepositoryError>;

    async fn find(
        &self,
        job_id: &JobId,
        kind: ArtifactKind,
    ) -> Result<Option<StoredResult>, RepositoryError>;

    /// All results recorded for a job, in no particular order.
    async fn list_for_job(&self, job_id: &JobId) -> Result<Vec<StoredResult>, RepositoryError>;

    /// Cheap reachability probe used by the health endpoint.
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
