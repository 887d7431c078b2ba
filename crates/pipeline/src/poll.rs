//! Bounded polling of a pending engine task.
//!
//! Polls on a fixed interval, first poll one interval after start, for at
//! most `ceil(budget / interval)` attempts. A poll that errors still uses
//! up its attempt. The attempt count is the only bound: a slow status
//! request delays the next poll but never skips one. Cancellation is
//! observed between polls.

use std::time::Duration;

use prodgen_core::types::JobId;
use prodgen_engine::{EngineStatus, InferenceEngine, PendingHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Non-terminal statuses are logged at most this often.
const PROGRESS_LOG_PERIOD: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub budget: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, budget: Duration) -> Self {
        Self { interval, budget }
    }

    /// `ceil(budget / interval)`, never less than one.
    pub fn max_attempts(&self) -> u32 {
        let interval = self.interval.as_millis().max(1);
        let attempts = self.budget.as_millis().div_ceil(interval);
        u32::try_from(attempts).unwrap_or(u32::MAX).max(1)
    }

    /// Attempts between two progress log lines.
    fn progress_every(&self) -> u32 {
        let interval = self.interval.as_millis().max(1);
        u32::try_from(PROGRESS_LOG_PERIOD.as_millis() / interval)
            .unwrap_or(u32::MAX)
            .max(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The engine finished; carries its output (`null` if it sent none).
    Completed(serde_json::Value),
    /// The engine reported `failed` or `cancelled`.
    Failed(EngineStatus),
    /// The attempt budget ran out while the task was still running.
    TimedOut { attempts: u32 },
    /// Shutdown was requested while polling.
    Interrupted,
}

/// Poll `handle` until it reaches a terminal status or the budget runs out.
pub async fn poll_until_terminal(
    engine: &dyn InferenceEngine,
    handle: &PendingHandle,
    policy: &PollPolicy,
    job_id: &JobId,
    cancel: &CancellationToken,
) -> PollOutcome {
    let max_attempts = policy.max_attempts();
    let progress_every = policy.progress_every();
    let started = Instant::now();

    let mut ticker = tokio::time::interval_at(started + policy.interval, policy.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for attempt in 1..=max_attempts {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(
                    job_id = %job_id,
                    task_id = %handle.task_id,
                    attempt,
                    "Polling interrupted by shutdown",
                );
                return PollOutcome::Interrupted;
            }
            _ = ticker.tick() => {}
        }

        match engine.poll(handle).await {
            Ok(response) => match response.status {
                EngineStatus::Completed => {
                    tracing::info!(
                        job_id = %job_id,
                        task_id = %handle.task_id,
                        attempt,
                        elapsed_secs = started.elapsed().as_secs(),
                        "Engine task completed",
                    );
                    return PollOutcome::Completed(
                        response.output.unwrap_or(serde_json::Value::Null),
                    );
                }
                EngineStatus::Failed | EngineStatus::Cancelled => {
                    return PollOutcome::Failed(response.status);
                }
                status => {
                    if attempt % progress_every == 0 {
                        tracing::info!(
                            job_id = %job_id,
                            task_id = %handle.task_id,
                            status = status.as_str(),
                            attempt,
                            max_attempts,
                            elapsed_secs = started.elapsed().as_secs(),
                            "Engine task still running",
                        );
                    }
                }
            },
            Err(e) => {
                tracing::warn!(
                    job_id = %job_id,
                    task_id = %handle.task_id,
                    attempt,
                    error = %e,
                    "Transient error polling engine",
                );
            }
        }
    }

    PollOutcome::TimedOut {
        attempts: max_attempts,
    }
}
