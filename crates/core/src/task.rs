//! Queued units of work.
//!
//! A [`Task`] is serialized as one flat JSON object per queue message:
//!
//! ```json
//! {"job_id": "...", "user_id": 7, "submitted_at": "...", "kind": "text",
//!  "product_name": "...", "category": "...", "price": 3500,
//!  "keywords": ["..."], "tone": "..."}
//! ```
//!
//! Consumers ignore fields they do not know. A message that is not valid
//! JSON, or lacks a required field, decodes to a [`TaskDecodeError`], which
//! the worker treats as permanent: the message is logged and dropped.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::kind::ArtifactKind;
use crate::types::{DbId, JobId, Timestamp};

/// Parameters for a product description task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TextTaskInput {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub product_name: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub category: String,
    /// Price in won.
    #[serde(default)]
    #[validate(range(min = 1))]
    pub price: i64,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub tone: String,
}

/// Parameters for a product image task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ImageTaskInput {
    /// Product name as entered by the user (usually Korean).
    #[serde(default)]
    #[validate(length(min = 1))]
    pub product_name: String,
}

/// Parameters for a research report task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ReportTaskInput {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub query: String,
}

/// Kind-specific task parameters, tagged by `kind` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskInput {
    Text(TextTaskInput),
    Image(ImageTaskInput),
    Report(ReportTaskInput),
}

impl TaskInput {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Text(_) => ArtifactKind::Text,
            Self::Image(_) => ArtifactKind::Image,
            Self::Report(_) => ArtifactKind::Report,
        }
    }

    pub fn validate(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            Self::Text(input) => input.validate(),
            Self::Image(input) => input.validate(),
            Self::Report(input) => input.validate(),
        }
    }
}

/// One queued unit of work for a single artifact kind within a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub job_id: JobId,
    #[serde(default)]
    pub user_id: DbId,
    #[serde(default = "chrono::Utc::now")]
    pub submitted_at: Timestamp,
    #[serde(flatten)]
    pub input: TaskInput,
}

/// Why a queue message could not be turned into a [`Task`].
///
/// Every variant is permanent: retrying the same bytes cannot succeed.
#[derive(Debug, thiserror::Error)]
pub enum TaskDecodeError {
    #[error("Malformed task message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Task message is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Task message failed validation: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

impl Task {
    pub fn new(job_id: JobId, user_id: DbId, input: TaskInput) -> Self {
        Self {
            job_id,
            user_id,
            submitted_at: chrono::Utc::now(),
            input,
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        self.input.kind()
    }

    /// Serialize to the queue wire format.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode and validate a queue message body.
    pub fn decode(body: &str) -> Result<Self, TaskDecodeError> {
        let task: Task = serde_json::from_str(body)?;
        if task.job_id.is_blank() {
            return Err(TaskDecodeError::MissingField("job_id"));
        }
        if task.user_id <= 0 {
            return Err(TaskDecodeError::MissingField("user_id"));
        }
        task.input.validate()?;
        Ok(task)
    }
}
