//! Persisted generation results.

use serde::{Deserialize, Serialize};

use crate::kind::ArtifactKind;
use crate::types::{DbId, JobId, Timestamp};

/// A result about to be written. At most one exists per `(job_id, kind)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewResult {
    pub job_id: JobId,
    pub kind: ArtifactKind,
    pub user_id: DbId,
    /// Generated text inline, or an artifact URL plus prompt metadata.
    pub payload: serde_json::Value,
}

/// A result as read back from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    pub job_id: JobId,
    pub kind: ArtifactKind,
    pub user_id: DbId,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}

/// What an idempotent upsert actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// A row for the pair already existed; the stored payload was kept.
    AlreadyPresent,
}
