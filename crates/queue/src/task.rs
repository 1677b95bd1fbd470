//! The broker payload handed from ingress to the worker pool.

use serde::{Deserialize, Serialize};

use imgconv_core::types::JobId;

/// A unit of work on the queue: which job to convert, to what, and which
/// live session (if any) should receive push updates.
///
/// `attempts` counts completed delivery attempts; the broker's retry
/// policy uses it to decide between re-enqueue and dead-letter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertTask {
    pub job_id: JobId,
    pub output_format: String,
    pub session_id: Option<String>,
    #[serde(default)]
    pub attempts: u32,
}

impl ConvertTask {
    pub fn new(job_id: JobId, output_format: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            job_id,
            output_format: output_format.into(),
            session_id,
            attempts: 0,
        }
    }
}
