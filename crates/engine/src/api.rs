//! REST client for the inference engine's serverless endpoints.
//!
//! One endpoint id per artifact kind; every request carries the API key as
//! a bearer token.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use prodgen_core::kind::ArtifactKind;

use crate::messages::{PendingHandle, StatusResponse, SubmitOutcome};

/// Timeout for a single submit request.
pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for a single status request.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors from the engine REST layer.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The engine returned a non-2xx status code.
    #[error("Engine API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    /// A 2xx response that carries neither an output nor a task id.
    #[error("Unexpected engine response: {0}")]
    UnexpectedResponse(String),

    /// No endpoint id is configured for the kind.
    #[error("No engine endpoint configured for kind '{0}'")]
    MissingEndpoint(ArtifactKind),
}

/// Submit/poll seam used by the task processor.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Start generation for `kind` with the given engine input object.
    async fn submit(
        &self,
        kind: ArtifactKind,
        input: &serde_json::Value,
    ) -> Result<SubmitOutcome, EngineError>;

    /// Fetch the current status of a pending task.
    async fn poll(&self, handle: &PendingHandle) -> Result<StatusResponse, EngineError>;
}

/// Connection settings for [`EngineApi`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// e.g. `https://api.runpod.ai/v2`.
    pub base_url: String,
    pub api_key: String,
    pub endpoints: HashMap<ArtifactKind, String>,
}

/// HTTP client for the inference engine.
pub struct EngineApi {
    client: reqwest::Client,
    config: EngineConfig,
}

impl EngineApi {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: EngineConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self, kind: ArtifactKind) -> Result<&str, EngineError> {
        self.config
            .endpoints
            .get(&kind)
            .map(String::as_str)
            .ok_or(EngineError::MissingEndpoint(kind))
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, or turn it into an
    /// [`EngineError::ApiError`] carrying the body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, EngineError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(status = status.as_u16(), %body, "Engine API returned an error status");
            return Err(EngineError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, EngineError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl InferenceEngine for EngineApi {
    async fn submit(
        &self,
        kind: ArtifactKind,
        input: &serde_json::Value,
    ) -> Result<SubmitOutcome, EngineError> {
        let endpoint = self.endpoint(kind)?;
        let body = serde_json::json!({ "input": input });
        tracing::debug!(kind = kind.as_str(), endpoint, "Submitting engine job");

        let response = self
            .client
            .post(format!("{}/{endpoint}/run", self.base_url()))
            .bearer_auth(&self.config.api_key)
            .timeout(SUBMIT_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let parsed: StatusResponse = Self::parse_response(response).await?;

        if let Some(output) = parsed.output() {
            return Ok(SubmitOutcome::Immediate(output.clone()));
        }

        match parsed.id {
            Some(task_id) if !task_id.is_empty() => {
                let poll_url = format!("{}/{endpoint}/status/{task_id}", self.base_url());
                tracing::debug!(
                    kind = kind.as_str(),
                    task_id = %task_id,
                    status = parsed.status.as_str(),
                    "Engine job accepted for polling",
                );
                Ok(SubmitOutcome::Pending(PendingHandle {
                    kind,
                    task_id,
                    status: parsed.status,
                    poll_url,
                }))
            }
            _ => Err(EngineError::UnexpectedResponse(
                "submit response has neither output nor id".to_string(),
            )),
        }
    }

    async fn poll(&self, handle: &PendingHandle) -> Result<StatusResponse, EngineError> {
        let response = self
            .client
            .get(&handle.poll_url)
            .bearer_auth(&self.config.api_key)
            .timeout(POLL_TIMEOUT)
            .send()
            .await?;

        Self::parse_response(response).await
    }
}
