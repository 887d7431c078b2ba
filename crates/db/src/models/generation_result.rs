use prodgen_core::error::CoreError;
use prodgen_core::kind::ArtifactKind;
use prodgen_core::result::StoredResult;
use prodgen_core::types::{DbId, JobId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `generation_results` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GenerationResult {
    pub id: DbId,
    pub job_id: String,
    pub kind: String,
    pub user_id: DbId,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}

impl TryFrom<GenerationResult> for StoredResult {
    type Error = CoreError;

    fn try_from(row: GenerationResult) -> Result<Self, Self::Error> {
        let kind: ArtifactKind = row.kind.parse().map_err(|_| {
            CoreError::Internal(format!(
                "generation_results row {} has unknown kind '{}'",
                row.id, row.kind
            ))
        })?;
        Ok(StoredResult {
            job_id: JobId::from(row.job_id),
            kind,
            user_id: row.user_id,
            payload: row.payload,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str) -> GenerationResult {
        GenerationResult {
            id: 1,
            job_id: "job-1".into(),
            kind: kind.into(),
            user_id: 7,
            payload: serde_json::json!({"description": "d"}),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn converts_known_kind() {
        let stored = StoredResult::try_from(row("text")).unwrap();
        assert_eq!(stored.kind, ArtifactKind::Text);
        assert_eq!(stored.job_id.as_str(), "job-1");
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = StoredResult::try_from(row("video")).unwrap_err();
        assert!(err.to_string().contains("video"));
    }
}
