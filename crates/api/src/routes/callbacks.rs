use axum::routing::post;
use axum::Router;

use crate::handlers::callbacks;
use crate::state::AppState;

/// Routes mounted at `/callbacks`.
///
/// ```text
/// POST   /                     -> receive_callback
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(callbacks::receive_callback))
}
