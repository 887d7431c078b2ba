//! Route definitions for research reports.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::report;
use crate::state::AppState;

/// Routes mounted at `/report`.
///
/// ```text
/// POST   /generate             -> submit_report
/// GET    /status/{job_id}      -> report_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(report::submit_report))
        .route("/status/{job_id}", get(report::report_status))
}
