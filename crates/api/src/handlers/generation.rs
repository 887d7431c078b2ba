//! Handlers for product generation (`/generated`).
//!
//! A product job fans out into a description task and an image task by
//! default; `kinds` narrows it to one of them.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use prodgen_core::error::CoreError;
use prodgen_core::kind::ArtifactKind;
use prodgen_core::task::{ImageTaskInput, TaskInput, TextTaskInput};
use prodgen_core::types::DbId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::StatusQuery;
use crate::error::AppResult;
use crate::jobs::SubmittedJob;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /generated/product`.
///
/// `category`, `price` and `tone` are only needed when a description is
/// requested; the task validation enforces them then.
#[derive(Debug, Deserialize, Validate)]
pub struct ProductGenerateRequest {
    #[validate(range(min = 1))]
    pub user_id: DbId,
    #[validate(length(min = 1, max = 200))]
    pub product_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub tone: String,
    /// Defaults to `[text, image]`.
    pub kinds: Option<Vec<ArtifactKind>>,
}

impl ProductGenerateRequest {
    /// One task input per requested kind, in request order.
    pub fn into_task_inputs(self) -> Result<Vec<TaskInput>, CoreError> {
        let kinds = self
            .kinds
            .unwrap_or_else(|| ArtifactKind::PRODUCT_DEFAULT.to_vec());

        kinds
            .into_iter()
            .map(|kind| match kind {
                ArtifactKind::Text => Ok(TaskInput::Text(TextTaskInput {
                    product_name: self.product_name.clone(),
                    category: self.category.clone(),
                    price: self.price,
                    keywords: self.keywords.clone(),
                    tone: self.tone.clone(),
                })),
                ArtifactKind::Image => Ok(TaskInput::Image(ImageTaskInput {
                    product_name: self.product_name.clone(),
                })),
                ArtifactKind::Report => Err(CoreError::Validation(
                    "Reports are requested through /report/generate".into(),
                )),
            })
            .collect()
    }
}

/// 202 body of both submission routes.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: &'static str,
    pub kinds: Vec<ArtifactKind>,
}

impl From<SubmittedJob> for SubmitResponse {
    fn from(job: SubmittedJob) -> Self {
        Self {
            job_id: job.job_id.to_string(),
            status: "processing",
            kinds: job.kinds,
        }
    }
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/generated/product
///
/// Enqueue the product job and return 202 with its id immediately.
pub async fn submit_product(
    State(state): State<AppState>,
    Json(input): Json<ProductGenerateRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate().map_err(CoreError::from)?;
    let user_id = input.user_id;
    let inputs = input.into_task_inputs()?;

    let job = state.submitter.submit(user_id, inputs).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: SubmitResponse::from(job),
        }),
    ))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/v1/generated/status/{job_id}
///
/// Expected kinds default to `text,image`; override with `?kinds=`.
pub async fn product_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> AppResult<impl IntoResponse> {
    let report = super::job_status(&state, job_id, &query, &ArtifactKind::PRODUCT_DEFAULT).await?;
    Ok(Json(DataResponse { data: report }))
}
