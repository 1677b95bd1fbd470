//! The status event value and its channel naming.

use serde::{Deserialize, Serialize};

use imgconv_core::types::JobId;
use imgconv_core::{ConversionStatus, StatusSnapshot};

/// Channel carrying every event for one job, regardless of session.
pub fn job_channel(job_id: JobId) -> String {
    format!("task_status:job:{job_id}")
}

/// Channel carrying events for one live client session.
pub fn session_channel(session_id: &str) -> String {
    format!("task_status:{session_id}")
}

/// Snapshot published whenever a job's status changes.
///
/// A value, not an entity: it has no identity and no storage obligation
/// beyond transient delivery to current subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub status: ConversionStatus,
    pub session_id: Option<String>,
    pub job_id: JobId,
    pub output_path: Option<String>,
    pub output_format: String,
    pub error: Option<String>,
}

impl StatusEvent {
    /// Build the event matching a job snapshot.
    pub fn from_snapshot(
        job_id: JobId,
        session_id: Option<String>,
        snapshot: &StatusSnapshot,
    ) -> Self {
        Self {
            status: snapshot.status,
            session_id,
            job_id,
            output_path: snapshot.output_path.clone(),
            output_format: snapshot.output_format.clone(),
            error: snapshot.error.clone(),
        }
    }
}
