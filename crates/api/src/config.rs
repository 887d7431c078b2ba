use std::path::PathBuf;
use std::str::FromStr;

use prodgen_core::error::CoreError;
use prodgen_core::kind::ArtifactKind;

/// Task queue name per artifact kind.
///
/// A kind without a queue is not a startup error: submissions that need it
/// fail with a configuration error naming the variable to set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueRoutes {
    pub text: Option<String>,
    pub image: Option<String>,
    pub report: Option<String>,
}

impl QueueRoutes {
    /// Queue for `kind`, or [`CoreError::MissingSetting`] naming the variable.
    pub fn queue_for(&self, kind: ArtifactKind) -> Result<&str, CoreError> {
        let queue = match kind {
            ArtifactKind::Text => &self.text,
            ArtifactKind::Image => &self.image,
            ArtifactKind::Report => &self.report,
        };
        queue
            .as_deref()
            .ok_or_else(|| CoreError::MissingSetting(queue_env_var(kind)))
    }
}

/// `TEXT_TASK_QUEUE`, `IMAGE_TASK_QUEUE`, ...
pub fn queue_env_var(kind: ArtifactKind) -> String {
    format!("{}_TASK_QUEUE", kind.env_prefix())
}

/// Server configuration loaded from environment variables.
///
/// All fields except the database URL have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Time allowed for in-flight requests after a shutdown signal (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub database_url: String,
    pub queues: QueueRoutes,
    /// Root directory of the local artifact store (default: `./artifacts`).
    pub artifact_dir: PathBuf,
    /// Public URL prefix under which `artifact_dir` is served.
    pub artifact_public_url: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                           |
    /// |------------------------|-----------------------------------|
    /// | `HOST`                 | `0.0.0.0`                         |
    /// | `PORT`                 | `3000`                            |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`           |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                              |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                              |
    /// | `DATABASE_URL`         | required                          |
    /// | `TEXT_TASK_QUEUE`      | unset                             |
    /// | `IMAGE_TASK_QUEUE`     | unset                             |
    /// | `REPORT_TASK_QUEUE`    | unset                             |
    /// | `ARTIFACT_DIR`         | `./artifacts`                     |
    /// | `ARTIFACT_PUBLIC_URL`  | `http://localhost:3000/artifacts` |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Blank values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(get("PORT"), "PORT", 3000)?;

        let cors_origins: Vec<String> = get("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parse_or(get("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS", 30)?;
        let shutdown_timeout_secs =
            parse_or(get("SHUTDOWN_TIMEOUT_SECS"), "SHUTDOWN_TIMEOUT_SECS", 30)?;

        let database_url =
            get("DATABASE_URL").ok_or_else(|| CoreError::MissingSetting("DATABASE_URL".into()))?;

        let queues = QueueRoutes {
            text: get(&queue_env_var(ArtifactKind::Text)),
            image: get(&queue_env_var(ArtifactKind::Image)),
            report: get(&queue_env_var(ArtifactKind::Report)),
        };

        let artifact_dir = PathBuf::from(get("ARTIFACT_DIR").unwrap_or_else(|| "./artifacts".into()));
        let artifact_public_url = get("ARTIFACT_PUBLIC_URL")
            .unwrap_or_else(|| "http://localhost:3000/artifacts".into());

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            database_url,
            queues,
            artifact_dir,
            artifact_public_url,
        })
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T, CoreError> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| CoreError::Validation(format!("{key} must be a valid number, got '{raw}'"))),
    }
}
