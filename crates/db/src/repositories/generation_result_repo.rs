//! Repository for the `generation_results` table.

use prodgen_core::kind::ArtifactKind;
use prodgen_core::types::{DbId, JobId};
use sqlx::PgPool;

use crate::models::generation_result::GenerationResult;

/// Column list for `generation_results` queries.
const COLUMNS: &str = "id, job_id, kind, user_id, payload, created_at";

/// Provides idempotent writes and per-job reads of generation results.
pub struct GenerationResultRepo;

impl GenerationResultRepo {
    /// Insert a result unless the `(job_id, kind)` pair already has one.
    ///
    /// Returns the new row id, or `None` when the existing row was kept.
    pub async fn insert_if_absent(
        pool: &PgPool,
        job_id: &JobId,
        kind: ArtifactKind,
        user_id: DbId,
        payload: &serde_json::Value,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO generation_results (job_id, kind, user_id, payload) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT ON CONSTRAINT uq_generation_results_job_kind DO NOTHING \
             RETURNING id",
        )
        .bind(job_id.as_str())
        .bind(kind.as_str())
        .bind(user_id)
        .bind(payload)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_job_and_kind(
        pool: &PgPool,
        job_id: &JobId,
        kind: ArtifactKind,
    ) -> Result<Option<GenerationResult>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generation_results WHERE job_id = $1 AND kind = $2");
        sqlx::query_as::<_, GenerationResult>(&query)
            .bind(job_id.as_str())
            .bind(kind.as_str())
            .fetch_optional(pool)
            .await
    }

    /// List every result recorded for a job, oldest first.
    pub async fn list_by_job(
        pool: &PgPool,
        job_id: &JobId,
    ) -> Result<Vec<GenerationResult>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generation_results WHERE job_id = $1 ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, GenerationResult>(&query)
            .bind(job_id.as_str())
            .fetch_all(pool)
            .await
    }
}
