//! Engine wire types.
//!
//! `POST {base}/{endpoint}/run` answers either
//! `{"id": "...", "status": "IN_QUEUE"}` or, for fast models,
//! `{"id": "...", "status": "COMPLETED", "output": {...}}`.
//! `GET {base}/{endpoint}/status/{id}` answers the same shape.

use prodgen_core::kind::ArtifactKind;
use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineStatus {
    #[serde(rename = "IN_QUEUE")]
    Queued,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED", alias = "TIMED_OUT")]
    Failed,
    #[serde(rename = "CANCELLED")]
    Cancelled,
    /// Anything else; treated as still running.
    #[serde(other)]
    Unknown,
}

impl EngineStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }
}

/// Body of both the submit and the status responses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_status")]
    pub status: EngineStatus,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
}

fn default_status() -> EngineStatus {
    EngineStatus::Queued
}

impl StatusResponse {
    /// The output, if present and not JSON `null`.
    pub fn output(&self) -> Option<&serde_json::Value> {
        self.output.as_ref().filter(|v| !v.is_null())
    }
}

/// Worker-local reference to an engine task still being generated.
/// Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingHandle {
    pub kind: ArtifactKind,
    pub task_id: String,
    pub status: EngineStatus,
    pub poll_url: String,
}

/// What a submit produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The engine answered inline.
    Immediate(serde_json::Value),
    /// The engine queued the work; poll the handle.
    Pending(PendingHandle),
}
