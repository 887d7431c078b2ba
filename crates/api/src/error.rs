use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use prodgen_core::artifact::ArtifactError;
use prodgen_core::error::CoreError;
use prodgen_core::queue::QueueError;
use prodgen_core::repository::RepositoryError;
use serde_json::json;

use crate::jobs::{ReceiveError, SubmitError};

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain and storage errors and implements [`IntoResponse`] to
/// produce consistent `{ "error", "code" }` JSON bodies. Messages of 5xx
/// responses are sanitized, except configuration errors, which name the
/// missing setting.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Receive(#[from] ReceiveError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type ErrorParts = (StatusCode, &'static str, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),

            AppError::Submit(err) => match err {
                SubmitError::Core(core) => classify_core_error(core),
                SubmitError::Queue(queue) => classify_queue_error(queue),
                SubmitError::Encode(e) => internal(e),
            },

            AppError::Receive(err) => match err {
                ReceiveError::Invalid(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                ReceiveError::Artifact(ArtifactError::Io(e)) => internal(e),
                ReceiveError::Artifact(e) => {
                    (StatusCode::BAD_REQUEST, "INVALID_ARTIFACT", e.to_string())
                }
                ReceiveError::Repository(repo) => classify_repository_error(repo),
            },

            AppError::Repository(repo) => classify_repository_error(repo),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(err: &CoreError) -> ErrorParts {
    match err {
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::MissingSetting(_) => {
            tracing::error!(error = %err, "Configuration error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIGURATION_ERROR",
                err.to_string(),
            )
        }
        CoreError::Internal(msg) => internal(msg),
    }
}

fn classify_queue_error(err: &QueueError) -> ErrorParts {
    match err {
        QueueError::Unavailable(_) => {
            tracing::error!(error = %err, "Task queue unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "QUEUE_UNAVAILABLE",
                "The task queue is unavailable, retry the submission".to_string(),
            )
        }
        QueueError::Backend(_) => internal(err),
    }
}

fn classify_repository_error(err: &RepositoryError) -> ErrorParts {
    match err {
        RepositoryError::Unavailable(_) => {
            tracing::error!(error = %err, "Result storage unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORAGE_UNAVAILABLE",
                "Result storage is unavailable".to_string(),
            )
        }
        RepositoryError::Backend(_) => internal(err),
    }
}

/// Log the real error and return a sanitized 500.
fn internal(err: &dyn std::fmt::Display) -> ErrorParts {
    tracing::error!(error = %err, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
