//! Callback path: persist one worker result per `(job_id, kind)`.
//!
//! Images are written to the artifact store first and the result row then
//! references the returned URL. The two writes are not transactional; if the
//! row write fails the blob is orphaned, which is harmless because its key
//! is derived from its content.

use std::sync::Arc;

use prodgen_core::artifact::{decode_image_base64, image_key, ArtifactError, ArtifactStore};
use prodgen_core::envelope::{CallbackEnvelope, ImageCallback, ReportCallback, TextCallback};
use prodgen_core::kind::ArtifactKind;
use prodgen_core::repository::{RepositoryError, ResultRepository};
use prodgen_core::result::{NewResult, UpsertOutcome};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ReceiveError {
    #[error("Invalid callback: {0}")]
    Invalid(String),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct CallbackReceiver {
    results: Arc<dyn ResultRepository>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl CallbackReceiver {
    pub fn new(results: Arc<dyn ResultRepository>, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self { results, artifacts }
    }

    /// Validate and store one callback. Duplicates are absorbed and report
    /// [`UpsertOutcome::AlreadyPresent`].
    pub async fn receive(&self, envelope: CallbackEnvelope) -> Result<UpsertOutcome, ReceiveError> {
        validate(&envelope)?;

        let kind = envelope.kind();
        let job_id = envelope.job_id().clone();
        let user_id = envelope.user_id();

        let payload = match envelope {
            CallbackEnvelope::Text(cb) => text_payload(cb),
            CallbackEnvelope::Report(cb) => report_payload(cb),
            CallbackEnvelope::Image(cb) => {
                // Skip the blob write when the pair is already recorded.
                if self.results.find(&job_id, kind).await?.is_some() {
                    tracing::info!(job_id = %job_id, kind = kind.as_str(), "Duplicate callback absorbed");
                    return Ok(UpsertOutcome::AlreadyPresent);
                }
                self.image_payload(cb).await?
            }
        };

        let outcome = self
            .results
            .upsert(NewResult {
                job_id: job_id.clone(),
                kind,
                user_id,
                payload,
            })
            .await?;

        match outcome {
            UpsertOutcome::Inserted => {
                tracing::info!(job_id = %job_id, kind = kind.as_str(), user_id, "Result stored");
            }
            UpsertOutcome::AlreadyPresent => {
                tracing::info!(job_id = %job_id, kind = kind.as_str(), "Duplicate callback absorbed");
            }
        }
        Ok(outcome)
    }

    async fn image_payload(&self, cb: ImageCallback) -> Result<serde_json::Value, ReceiveError> {
        let bytes = decode_image_base64(&cb.image_base64)?;
        let key = image_key(cb.user_id, &bytes);
        let size = bytes.len();
        let stored = self.artifacts.put(&key, bytes).await?;

        tracing::debug!(job_id = %cb.job_id, key = %stored.key, size, "Image artifact stored");

        Ok(json!({
            "image_url": stored.url,
            "artifact_key": stored.key,
            "product_name_ko": cb.product_name_ko,
            "product_name_en": cb.product_name_en,
            "prompt": cb.prompt,
        }))
    }
}

fn text_payload(cb: TextCallback) -> serde_json::Value {
    json!({
        "description": cb.description,
        "prompt": cb.prompt,
        "product_name": cb.product_name,
        "category": cb.category,
        "price": cb.price,
        "keywords": cb.keywords,
        "tone": cb.tone,
    })
}

fn report_payload(cb: ReportCallback) -> serde_json::Value {
    json!({
        "query": cb.query,
        "result": cb.result,
        "web_results": cb.web_results,
    })
}

fn validate(envelope: &CallbackEnvelope) -> Result<(), ReceiveError> {
    if envelope.job_id().is_blank() {
        return Err(ReceiveError::Invalid("job_id is required".into()));
    }
    if envelope.user_id() <= 0 {
        return Err(ReceiveError::Invalid("user_id must be a positive integer".into()));
    }

    let missing = match envelope {
        CallbackEnvelope::Text(cb) => first_blank(&[
            ("product_name", &cb.product_name),
            ("description", &cb.description),
        ]),
        CallbackEnvelope::Image(cb) => first_blank(&[
            ("product_name_ko", &cb.product_name_ko),
            ("image_base64", &cb.image_base64),
        ]),
        CallbackEnvelope::Report(cb) => first_blank(&[("query", &cb.query), ("result", &cb.result)]),
    };
    match missing {
        Some(field) => Err(ReceiveError::Invalid(format!(
            "{field} is required for {} callbacks",
            envelope.kind()
        ))),
        None => Ok(()),
    }
}

fn first_blank(fields: &[(&'static str, &String)]) -> Option<&'static str> {
    fields
        .iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
}
