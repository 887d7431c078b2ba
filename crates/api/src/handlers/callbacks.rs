//! Worker callback intake.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use prodgen_core::envelope::CallbackEnvelope;
use prodgen_core::kind::ArtifactKind;
use prodgen_core::result::UpsertOutcome;
use serde::Serialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub job_id: String,
    pub kind: ArtifactKind,
    /// `true` when a result for the pair already existed and this callback
    /// changed nothing.
    pub duplicate: bool,
}

/// POST /api/v1/callbacks
///
/// Returns 200 for both first and duplicate deliveries so the worker stops
/// retrying either way.
pub async fn receive_callback(
    State(state): State<AppState>,
    Json(envelope): Json<CallbackEnvelope>,
) -> AppResult<impl IntoResponse> {
    let job_id = envelope.job_id().to_string();
    let kind = envelope.kind();

    let outcome = state.receiver.receive(envelope).await?;

    Ok(Json(DataResponse {
        data: CallbackAck {
            job_id,
            kind,
            duplicate: outcome == UpsertOutcome::AlreadyPresent,
        },
    }))
}
