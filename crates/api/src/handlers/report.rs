//! Handlers for research reports (`/report`).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use prodgen_core::error::CoreError;
use prodgen_core::kind::ArtifactKind;
use prodgen_core::task::{ReportTaskInput, TaskInput};
use prodgen_core::types::DbId;
use serde::Deserialize;
use validator::Validate;

use super::generation::SubmitResponse;
use super::StatusQuery;
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ReportGenerateRequest {
    #[validate(range(min = 1))]
    pub user_id: DbId,
    #[validate(length(min = 1, max = 2000))]
    pub query: String,
}

/// POST /api/v1/report/generate
pub async fn submit_report(
    State(state): State<AppState>,
    Json(input): Json<ReportGenerateRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate().map_err(CoreError::from)?;

    let job = state
        .submitter
        .submit(
            input.user_id,
            vec![TaskInput::Report(ReportTaskInput { query: input.query })],
        )
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: SubmitResponse::from(job),
        }),
    ))
}

/// GET /api/v1/report/status/{job_id}
pub async fn report_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> AppResult<impl IntoResponse> {
    let report = super::job_status(&state, job_id, &query, &[ArtifactKind::Report]).await?;
    Ok(Json(DataResponse { data: report }))
}
