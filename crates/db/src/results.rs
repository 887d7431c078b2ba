//! [`ResultRepository`] backed by the `generation_results` table.

use async_trait::async_trait;
use prodgen_core::kind::ArtifactKind;
use prodgen_core::repository::{RepositoryError, ResultRepository};
use prodgen_core::result::{NewResult, StoredResult, UpsertOutcome};
use prodgen_core::types::JobId;

use crate::queue::is_unavailable;
use crate::repositories::GenerationResultRepo;
use crate::DbPool;

#[derive(Clone)]
pub struct PgResultRepository {
    pool: DbPool,
}

impl PgResultRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn repository_error(err: sqlx::Error) -> RepositoryError {
    if is_unavailable(&err) {
        RepositoryError::Unavailable(err.to_string())
    } else {
        RepositoryError::Backend(err.to_string())
    }
}

fn to_stored(row: crate::models::generation_result::GenerationResult) -> Result<StoredResult, RepositoryError> {
    StoredResult::try_from(row).map_err(|e| RepositoryError::Backend(e.to_string()))
}

#[async_trait]
impl ResultRepository for PgResultRepository {
    async fn upsert(&self, result: NewResult) -> Result<UpsertOutcome, RepositoryError> {
        let inserted = GenerationResultRepo::insert_if_absent(
            &self.pool,
            &result.job_id,
            result.kind,
            result.user_id,
            &result.payload,
        )
        .await
        .map_err(repository_error)?;

        Ok(match inserted {
            Some(_) => UpsertOutcome::Inserted,
            None => UpsertOutcome::AlreadyPresent,
        })
    }

    async fn find(
        &self,
        job_id: &JobId,
        kind: ArtifactKind,
    ) -> Result<Option<StoredResult>, RepositoryError> {
        GenerationResultRepo::find_by_job_and_kind(&self.pool, job_id, kind)
            .await
            .map_err(repository_error)?
            .map(to_stored)
            .transpose()
    }

    async fn list_for_job(&self, job_id: &JobId) -> Result<Vec<StoredResult>, RepositoryError> {
        GenerationResultRepo::list_by_job(&self.pool, job_id)
            .await
            .map_err(repository_error)?
            .into_iter()
            .map(to_stored)
            .collect()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        crate::health_check(&self.pool).await.map_err(repository_error)
    }
}
