//! Route definitions for product generation.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// Routes mounted at `/generated`.
///
/// ```text
/// POST   /product              -> submit_product
/// GET    /status/{job_id}      -> product_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/product", post(generation::submit_product))
        .route("/status/{job_id}", get(generation::product_status))
}
