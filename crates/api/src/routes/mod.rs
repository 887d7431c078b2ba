pub mod callbacks;
pub mod generation;
pub mod health;
pub mod report;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /generated/product                 submit product job (POST)
/// /generated/status/{job_id}         product job status (GET, ?kinds=)
///
/// /report/generate                   submit report job (POST)
/// /report/status/{job_id}            report job status (GET, ?kinds=)
///
/// /callbacks                         worker result callback (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/generated", generation::router())
        .nest("/report", report::router())
        .nest("/callbacks", callbacks::router())
}
