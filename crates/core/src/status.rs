//! Job status state enum.
//!
//! Stored as lowercase TEXT in the job store and as a lowercase JSON string
//! in the status cache and on the wire. Every store/cache boundary parses
//! the value back through [`ConversionStatus::parse`]; unknown values are
//! rejected instead of passed through.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle status of a conversion job.
///
/// Transitions are strictly `Queued -> Processing -> {Completed | Failed}`.
/// `Queued` is set by ingress; the other three only by the worker. A
/// terminal status is never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl ConversionStatus {
    /// The canonical lowercase string used in the store, cache, and wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse the canonical string form, rejecting anything unknown.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }

    /// Whether the job has reached a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ConversionStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}
