pub mod callbacks;
pub mod generation;
pub mod report;

use prodgen_core::error::CoreError;
use prodgen_core::kind::ArtifactKind;
use prodgen_core::types::JobId;
use serde::Deserialize;

use crate::error::AppResult;
use crate::jobs::JobStatusReport;
use crate::state::AppState;

/// `?kinds=text,image` override of a status route's expected kinds.
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub kinds: Option<String>,
}

impl StatusQuery {
    /// The requested kinds, or `default` when the parameter is absent.
    pub fn expected_kinds(&self, default: &[ArtifactKind]) -> AppResult<Vec<ArtifactKind>> {
        let Some(raw) = self.kinds.as_deref() else {
            return Ok(default.to_vec());
        };
        let kinds = ArtifactKind::parse_list(raw)?;
        if kinds.is_empty() {
            return Err(CoreError::Validation("kinds must name at least one artifact kind".into()).into());
        }
        Ok(kinds)
    }
}

/// Shared body of the status routes.
async fn job_status(
    state: &AppState,
    job_id: String,
    query: &StatusQuery,
    default_kinds: &[ArtifactKind],
) -> AppResult<JobStatusReport> {
    let job_id = JobId::from(job_id);
    if job_id.is_blank() {
        return Err(CoreError::Validation("job_id is required".into()).into());
    }
    let expected = query.expected_kinds(default_kinds)?;
    Ok(state.status.status(&job_id, &expected).await?)
}
