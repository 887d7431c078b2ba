use std::sync::Arc;

use prodgen_core::repository::ResultRepository;

use crate::config::ServerConfig;
use crate::jobs::{CallbackReceiver, JobSubmitter, StatusAggregator};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc`. Built once in `main` (or
/// the test harness) from concrete storage implementations.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub submitter: Arc<JobSubmitter>,
    pub receiver: Arc<CallbackReceiver>,
    pub status: Arc<StatusAggregator>,
    /// Result storage, probed by the health check.
    pub results: Arc<dyn ResultRepository>,
}
