//! Poll path: compute job completion from the stored results.
//!
//! Nothing tracks which kinds a job asked for. The caller passes the
//! expected kinds and the job is complete once each of them has a result.
//! A job whose task failed stays pending forever.

use std::collections::BTreeMap;
use std::sync::Arc;

use prodgen_core::kind::ArtifactKind;
use prodgen_core::repository::{RepositoryError, ResultRepository};
use prodgen_core::types::{JobId, Timestamp};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Complete,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KindStatus {
    pub present: bool,
    /// Inline text, or an image URL plus metadata. `null` while absent.
    pub payload: Option<serde_json::Value>,
    pub created_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatusReport {
    pub job_id: JobId,
    pub overall: OverallStatus,
    pub completed: bool,
    /// Keyed by kind name.
    pub kinds: BTreeMap<&'static str, KindStatus>,
}

pub struct StatusAggregator {
    results: Arc<dyn ResultRepository>,
}

impl StatusAggregator {
    pub fn new(results: Arc<dyn ResultRepository>) -> Self {
        Self { results }
    }

    /// Report per-kind presence for `expected`. Results of other kinds are
    /// ignored.
    pub async fn status(
        &self,
        job_id: &JobId,
        expected: &[ArtifactKind],
    ) -> Result<JobStatusReport, RepositoryError> {
        let mut stored = self.results.list_for_job(job_id).await?;

        let kinds: BTreeMap<&'static str, KindStatus> = expected
            .iter()
            .map(|kind| {
                let found = stored
                    .iter()
                    .position(|r| r.kind == *kind)
                    .map(|i| stored.swap_remove(i));
                let status = match found {
                    Some(result) => KindStatus {
                        present: true,
                        payload: Some(result.payload),
                        created_at: Some(result.created_at),
                    },
                    None => KindStatus {
                        present: false,
                        payload: None,
                        created_at: None,
                    },
                };
                (kind.as_str(), status)
            })
            .collect();

        let completed = kinds.values().all(|k| k.present);
        let overall = if completed {
            OverallStatus::Complete
        } else {
            OverallStatus::Pending
        };

        tracing::debug!(job_id = %job_id, overall = ?overall, "Job status computed");

        Ok(JobStatusReport {
            job_id: job_id.clone(),
            overall,
            completed,
            kinds,
        })
    }
}
