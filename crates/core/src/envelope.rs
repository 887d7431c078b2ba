//! Worker → origin callback payload.
//!
//! The origin service keeps no task state after enqueue, so the envelope
//! carries the original inputs next to the generated artifact. That is
//! what lets the receiver record the prompt and translation used.

use serde::{Deserialize, Serialize};

use crate::kind::ArtifactKind;
use crate::types::{DbId, JobId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextCallback {
    pub job_id: JobId,
    pub user_id: DbId,
    pub product_name: String,
    pub category: String,
    pub price: i64,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub tone: String,
    pub prompt: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageCallback {
    pub job_id: JobId,
    pub user_id: DbId,
    pub product_name_ko: String,
    pub product_name_en: String,
    pub prompt: String,
    /// Raw base64 without any `data:` URI prefix.
    pub image_base64: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportCallback {
    pub job_id: JobId,
    pub user_id: DbId,
    pub query: String,
    pub result: String,
    #[serde(default)]
    pub web_results: String,
}

/// Callback body, dispatched on its `kind` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CallbackEnvelope {
    Text(TextCallback),
    Image(ImageCallback),
    Report(ReportCallback),
}

impl CallbackEnvelope {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Text(_) => ArtifactKind::Text,
            Self::Image(_) => ArtifactKind::Image,
            Self::Report(_) => ArtifactKind::Report,
        }
    }

    pub fn job_id(&self) -> &JobId {
        match self {
            Self::Text(cb) => &cb.job_id,
            Self::Image(cb) => &cb.job_id,
            Self::Report(cb) => &cb.job_id,
        }
    }

    pub fn user_id(&self) -> DbId {
        match self {
            Self::Text(cb) => cb.user_id,
            Self::Image(cb) => cb.user_id,
            Self::Report(cb) => cb.user_id,
        }
    }
}
