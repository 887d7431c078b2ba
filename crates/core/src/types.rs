use std::fmt;

use serde::{Deserialize, Serialize};

/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Prefix carried by report job ids so they are recognisable in logs.
pub const REPORT_JOB_PREFIX: &str = "report_";

/// Correlation key shared by every task and result of one logical job.
///
/// Opaque to callers. Minted from a random UUID at submission time and
/// never stored as a row of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Mint a fresh product-generation job id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Mint a fresh report job id (`report_<uuid>`).
    pub fn generate_report() -> Self {
        Self(format!("{REPORT_JOB_PREFIX}{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(JobId::generate(), JobId::generate());
    }

    #[test]
    fn report_ids_carry_prefix() {
        let id = JobId::generate_report();
        assert!(id.as_str().starts_with(REPORT_JOB_PREFIX));
        assert_eq!(id.as_str().len(), REPORT_JOB_PREFIX.len() + 36);
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = JobId::from("abc");
        assert_eq!(serde_json::to_value(&id).unwrap(), serde_json::json!("abc"));
    }

    #[test]
    fn blank_detection() {
        assert!(JobId::from("  ").is_blank());
        assert!(!JobId::from("j-1").is_blank());
    }
}
