//! Artifact kinds a job can fan out into.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The type of artifact one task produces.
///
/// Each kind has its own queue, its own engine endpoint and its own poll
/// budget, because generation latency differs by modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Text,
    Image,
    Report,
}

impl ArtifactKind {
    /// Every kind, in declaration order.
    pub const ALL: [ArtifactKind; 3] = [Self::Text, Self::Image, Self::Report];

    /// Kinds a combined product request fans out into by default.
    pub const PRODUCT_DEFAULT: [ArtifactKind; 2] = [Self::Text, Self::Image];

    /// Wire and database name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Report => "report",
        }
    }

    /// Upper-case prefix used for per-kind environment variables
    /// (`TEXT_TASK_QUEUE`, `IMAGE_POLL_BUDGET_SECS`, ...).
    pub fn env_prefix(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Image => "IMAGE",
            Self::Report => "REPORT",
        }
    }

    /// Parse a comma-separated kind list such as `"text,image"`.
    ///
    /// Blank entries are skipped and duplicates collapse, keeping the first
    /// occurrence's position.
    pub fn parse_list(raw: &str) -> Result<Vec<ArtifactKind>, CoreError> {
        let mut kinds = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let kind: ArtifactKind = part.parse()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }
}

impl FromStr for ArtifactKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "report" => Ok(Self::Report),
            other => Err(CoreError::Validation(format!(
                "Unknown artifact kind '{other}'. Must be one of: text, image, report"
            ))),
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
