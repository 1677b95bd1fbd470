//! Point-in-time view of a job's status.
//!
//! [`StatusSnapshot`] is the value stored in the status cache and returned
//! by the polling endpoint. It is derived from the authoritative job row;
//! the cache copy is advisory and may be stale or absent.

use serde::{Deserialize, Serialize};

use crate::status::ConversionStatus;

/// URL prefix under which source artifacts are served.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// URL prefix under which converted artifacts are served.
pub const CONVERTED_URL_PREFIX: &str = "/converted";

/// Build the public URL for an uploaded source artifact.
pub fn uploads_url(relative_path: &str) -> String {
    format!("{UPLOADS_URL_PREFIX}/{relative_path}")
}

/// Build the public URL for a converted artifact.
pub fn converted_url(relative_path: &str) -> String {
    format!("{CONVERTED_URL_PREFIX}/{relative_path}")
}

/// Snapshot of a job's current state.
///
/// Invariants mirror the job row: `output_path` is present iff the status
/// is `completed`, `error` iff `failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: ConversionStatus,
    pub input_path: String,
    pub output_path: Option<String>,
    pub output_format: String,
    pub error: Option<String>,
}
