//! Callback delivery with fixed-delay retry.
//!
//! [`CallbackDelivery`] POSTs a JSON-encoded [`CallbackEnvelope`] to the
//! origin service. A transport error or non-2xx answer fails the attempt;
//! attempts are retried up to [`RetryPolicy::max_attempts`] with
//! [`RetryPolicy::delay`] between them. Each attempt is independent and
//! bounded by [`RetryPolicy::request_timeout`].

use std::time::Duration;

use async_trait::async_trait;
use prodgen_core::envelope::CallbackEnvelope;

/// Default timeout for a single delivery attempt. Image envelopes carry the
/// whole base64 payload.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The origin service returned a non-2xx status code.
    #[error("Callback returned HTTP {0}")]
    HttpStatus(u16),

    /// Every attempt failed.
    #[error("Callback delivery failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Zero is treated as one.
    pub max_attempts: u32,
    /// Pause between two attempts. There is no pause after the last one.
    pub delay: Duration,
    /// Timeout of one HTTP request.
    pub request_timeout: Duration,
}

impl RetryPolicy {
    /// Longest time a full delivery can take: every attempt timing out plus
    /// the pauses between them.
    pub fn window(&self) -> Duration {
        let attempts = self.max_attempts.max(1);
        self.request_timeout * attempts + self.delay * (attempts - 1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// CallbackSink
// ---------------------------------------------------------------------------

/// Destination for finished-task envelopes.
#[async_trait]
pub trait CallbackSink: Send + Sync {
    /// Deliver one envelope. Returns the number of attempts used.
    async fn deliver(&self, envelope: &CallbackEnvelope) -> Result<u32, CallbackError>;
}

// ---------------------------------------------------------------------------
// CallbackDelivery
// ---------------------------------------------------------------------------

/// Posts envelopes to a fixed callback URL.
pub struct CallbackDelivery {
    client: reqwest::Client,
    url: String,
    policy: RetryPolicy,
}

impl CallbackDelivery {
    pub fn new(url: impl Into<String>, policy: RetryPolicy) -> Result<Self, CallbackError> {
        let client = reqwest::Client::builder()
            .timeout(policy.request_timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            policy,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, payload: &CallbackEnvelope) -> Result<(), CallbackError> {
        let response = self.client.post(&self.url).json(payload).send().await?;
        if !response.status().is_success() {
            return Err(CallbackError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl CallbackSink for CallbackDelivery {
    async fn deliver(&self, envelope: &CallbackEnvelope) -> Result<u32, CallbackError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let job_id = envelope.job_id().as_str();
        let kind = envelope.kind().as_str();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.try_send(envelope).await {
                Ok(()) => {
                    tracing::info!(job_id, kind, attempt, "Callback delivered");
                    return Ok(attempt);
                }
                Err(e) => {
                    tracing::warn!(
                        job_id,
                        kind,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Callback delivery attempt failed",
                    );
                    last_error = e.to_string();
                    if attempt < max_attempts {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }

        tracing::error!(
            job_id,
            kind,
            attempts = max_attempts,
            url = %self.url,
            "Callback delivery failed after all retries, result lost",
        );
        Err(CallbackError::Exhausted {
            attempts: max_attempts,
            last_error,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
