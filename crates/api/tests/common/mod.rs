#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use prodgen_api::config::{QueueRoutes, ServerConfig};
use prodgen_api::jobs::{CallbackReceiver, JobSubmitter, StatusAggregator};
use prodgen_api::router::build_app_router;
use prodgen_api::state::AppState;
use prodgen_core::queue::TaskQueue;
use prodgen_db::memory::{InMemoryArtifactStore, InMemoryResultRepository, InMemoryTaskQueue};

pub const TEXT_QUEUE: &str = "text-tasks";
pub const IMAGE_QUEUE: &str = "image-tasks";
pub const REPORT_QUEUE: &str = "report-tasks";
pub const ARTIFACT_URL: &str = "http://localhost:3000/artifacts";

/// Build a test `ServerConfig` with safe defaults and every queue configured.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        database_url: "postgres://unused".to_string(),
        queues: QueueRoutes {
            text: Some(TEXT_QUEUE.to_string()),
            image: Some(IMAGE_QUEUE.to_string()),
            report: Some(REPORT_QUEUE.to_string()),
        },
        artifact_dir: PathBuf::from("./target/test-artifacts"),
        artifact_public_url: ARTIFACT_URL.to_string(),
    }
}

/// The app plus handles on its in-memory stores.
pub struct TestApp {
    pub router: Router,
    pub queue: Arc<InMemoryTaskQueue>,
    pub results: Arc<InMemoryResultRepository>,
    pub artifacts: Arc<InMemoryArtifactStore>,
}

/// Build the full application router over in-memory stores.
pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config())
}

pub fn build_test_app_with(config: ServerConfig) -> TestApp {
    let queue = Arc::new(InMemoryTaskQueue::new());
    let router = build_router(config, queue.clone());
    TestApp {
        router: router.0,
        queue,
        results: router.1,
        artifacts: router.2,
    }
}

/// Build the router over an arbitrary task queue.
pub fn build_router(
    config: ServerConfig,
    queue: Arc<dyn TaskQueue>,
) -> (Router, Arc<InMemoryResultRepository>, Arc<InMemoryArtifactStore>) {
    let results = Arc::new(InMemoryResultRepository::new());
    let artifacts = Arc::new(InMemoryArtifactStore::new(config.artifact_public_url.clone()));

    let state = AppState {
        config: Arc::new(config.clone()),
        submitter: Arc::new(JobSubmitter::new(queue, config.queues.clone())),
        receiver: Arc::new(CallbackReceiver::new(results.clone(), artifacts.clone())),
        status: Arc::new(StatusAggregator::new(results.clone())),
        results: results.clone(),
    };

    (build_app_router(state, &config), results, artifacts)
}

/// Send a GET request.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a POST request with a JSON body.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
