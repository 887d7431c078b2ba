use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use prodgen_core::kind::ArtifactKind;
use prodgen_engine::api::SUBMIT_TIMEOUT;
use prodgen_engine::EngineConfig;
use prodgen_events::RetryPolicy;
use prodgen_pipeline::{PollPolicies, PollPolicy};

/// Default DeepL endpoint, used when only `DEEPL_AUTH_KEY` is set.
const DEFAULT_DEEPL_URL: &str = "https://api-free.deepl.com/v2/translate";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(String),

    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Translation service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeeplConfig {
    pub url: String,
    pub auth_key: String,
}

/// Worker configuration loaded from environment variables.
///
/// Everything the consumed kinds need is checked up front, so a worker
/// never starts consuming with a setting it will later find missing.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    /// Kinds this process consumes.
    pub kinds: Vec<ArtifactKind>,
    /// Consumer loops per kind.
    pub concurrency: usize,
    pub engine: EngineConfig,
    /// Queue name per consumed kind.
    pub queues: HashMap<ArtifactKind, String>,
    pub callback_url: String,
    pub poll_policies: PollPolicies,
    pub callback_retry: RetryPolicy,
    /// Always longer than the slowest consumed task can run.
    pub visibility_timeout: Duration,
    pub idle_poll_interval: Duration,
    pub shutdown_timeout: Duration,
    /// `None` disables translation; image prompts then use the name as is.
    pub deepl: Option<DeeplConfig>,
}

impl WorkerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                          | Default                      |
    /// |----------------------------------|------------------------------|
    /// | `DATABASE_URL`                   | required                     |
    /// | `WORKER_KINDS`                   | `text,image,report`          |
    /// | `WORKER_CONCURRENCY`             | `1`                          |
    /// | `ENGINE_BASE_URL`                | `https://api.runpod.ai/v2`   |
    /// | `ENGINE_API_KEY`                 | required                     |
    /// | `ENGINE_{KIND}_ENDPOINT_ID`      | required per consumed kind   |
    /// | `{KIND}_TASK_QUEUE`              | required per consumed kind   |
    /// | `CALLBACK_URL`                   | required                     |
    /// | `POLL_INTERVAL_SECS`             | `2`                          |
    /// | `{KIND}_POLL_BUDGET_SECS`        | `600` / `1200` / `1200`      |
    /// | `CALLBACK_MAX_ATTEMPTS`          | `3`                          |
    /// | `CALLBACK_RETRY_DELAY_SECS`      | `5`                          |
    /// | `CALLBACK_TIMEOUT_SECS`          | `30`                         |
    /// | `QUEUE_VISIBILITY_TIMEOUT_SECS`  | `3600`                       |
    /// | `QUEUE_IDLE_POLL_MS`             | `1000`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`          | `30`                         |
    /// | `DEEPL_AUTH_KEY`, `DEEPL_URL`    | unset (translation disabled) |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let database_url = env.required("DATABASE_URL")?;

        let kinds_raw = env.or("WORKER_KINDS", "text,image,report");
        let kinds = ArtifactKind::parse_list(&kinds_raw).map_err(|e| ConfigError::Invalid {
            key: "WORKER_KINDS".into(),
            value: kinds_raw.clone(),
            reason: e.to_string(),
        })?;
        if kinds.is_empty() {
            return Err(ConfigError::Missing("WORKER_KINDS".into()));
        }

        let concurrency: usize = env.parsed("WORKER_CONCURRENCY", 1)?;
        if concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "WORKER_CONCURRENCY".into(),
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        let mut endpoints = HashMap::new();
        let mut queues = HashMap::new();
        for kind in &kinds {
            let prefix = kind.env_prefix();
            endpoints.insert(*kind, env.required(&format!("ENGINE_{prefix}_ENDPOINT_ID"))?);
            queues.insert(*kind, env.required(&format!("{prefix}_TASK_QUEUE"))?);
        }

        let engine = EngineConfig {
            base_url: env.or("ENGINE_BASE_URL", "https://api.runpod.ai/v2"),
            api_key: env.required("ENGINE_API_KEY")?,
            endpoints,
        };

        let callback_url = env.required("CALLBACK_URL")?;

        let interval = Duration::from_secs(env.parsed("POLL_INTERVAL_SECS", 2)?);
        if interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "POLL_INTERVAL_SECS".into(),
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        let budget = |kind: ArtifactKind, default: u64| -> Result<PollPolicy, ConfigError> {
            let key = format!("{}_POLL_BUDGET_SECS", kind.env_prefix());
            Ok(PollPolicy::new(interval, Duration::from_secs(env.parsed(&key, default)?)))
        };
        let poll_policies = PollPolicies {
            text: budget(ArtifactKind::Text, 600)?,
            image: budget(ArtifactKind::Image, 1200)?,
            report: budget(ArtifactKind::Report, 1200)?,
        };

        let callback_retry = RetryPolicy {
            max_attempts: env.parsed("CALLBACK_MAX_ATTEMPTS", 3)?,
            delay: Duration::from_secs(env.parsed("CALLBACK_RETRY_DELAY_SECS", 5)?),
            request_timeout: Duration::from_secs(env.parsed("CALLBACK_TIMEOUT_SECS", 30)?),
        };

        // A claim that expires mid-task hands the message to a second worker.
        let visibility_timeout =
            Duration::from_secs(env.parsed("QUEUE_VISIBILITY_TIMEOUT_SECS", 3600)?);
        let longest_task = longest_task_run(&kinds, &poll_policies, &callback_retry);
        if visibility_timeout <= longest_task {
            return Err(ConfigError::Invalid {
                key: "QUEUE_VISIBILITY_TIMEOUT_SECS".into(),
                value: visibility_timeout.as_secs().to_string(),
                reason: format!(
                    "must exceed the longest task run of {}s (submit, poll budget and callback retries)",
                    longest_task.as_secs()
                ),
            });
        }

        let deepl = env.optional("DEEPL_AUTH_KEY").map(|auth_key| DeeplConfig {
            url: env.or("DEEPL_URL", DEFAULT_DEEPL_URL),
            auth_key,
        });

        Ok(Self {
            database_url,
            kinds,
            concurrency,
            engine,
            queues,
            callback_url,
            poll_policies,
            callback_retry,
            visibility_timeout,
            idle_poll_interval: Duration::from_millis(env.parsed("QUEUE_IDLE_POLL_MS", 1000)?),
            shutdown_timeout: Duration::from_secs(env.parsed("SHUTDOWN_TIMEOUT_SECS", 30)?),
            deepl,
        })
    }
}

/// Upper bound on one task among `kinds`: submit timeout, the full poll
/// budget and every callback attempt.
fn longest_task_run(
    kinds: &[ArtifactKind],
    policies: &PollPolicies,
    callback_retry: &RetryPolicy,
) -> Duration {
    let longest_poll = kinds
        .iter()
        .map(|kind| {
            let policy = policies.for_kind(*kind);
            policy.interval * policy.max_attempts()
        })
        .max()
        .unwrap_or_default();
    SUBMIT_TIMEOUT + longest_poll + callback_retry.window()
}

/// Typed accessors over a key lookup. Blank values count as unset.
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }
}
