//! Status polling and job listing.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use imgconv_core::error::CoreError;
use imgconv_core::types::{JobId, Timestamp};
use imgconv_core::{ConversionStatus, StatusSnapshot};
use imgconv_db::models::job::Job;
use imgconv_db::repositories::JobRepo;
use imgconv_queue::job_status_key;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /api/status/{job_id}
///
/// Serve the cached snapshot when present; otherwise fall back to the job
/// store. The cache is advisory, so a read failure is logged and treated
/// like a miss rather than surfaced to the client.
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<Json<StatusSnapshot>> {
    match state.cache.get(&job_status_key(job_id)).await {
        Ok(Some(snapshot)) => return Ok(Json(snapshot)),
        Ok(None) => {}
        Err(error) => {
            tracing::warn!(job_id = %job_id, %error, "Status cache read failed");
        }
    }

    let job = JobRepo::find_by_id(&state.pool, job_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        })?;

    Ok(Json(job.to_snapshot()))
}

/// One entry in the job listing.
#[derive(Debug, Serialize)]
pub struct JobListEntry {
    pub job_id: JobId,
    pub status: ConversionStatus,
    pub input_path: String,
    pub output_path: Option<String>,
    pub output_format: String,
    pub created_at: Timestamp,
    pub error: Option<String>,
}

impl From<Job> for JobListEntry {
    fn from(job: Job) -> Self {
        let snapshot = job.to_snapshot();
        Self {
            job_id: job.id,
            status: snapshot.status,
            input_path: snapshot.input_path,
            output_path: snapshot.output_path,
            output_format: snapshot.output_format,
            created_at: job.created_at,
            error: snapshot.error,
        }
    }
}

/// GET /api/jobs -- every job, newest first.
pub async fn list_jobs(State(state): State<AppState>) -> AppResult<Json<Vec<JobListEntry>>> {
    let jobs = JobRepo::list_all(&state.pool).await?;
    Ok(Json(jobs.into_iter().map(JobListEntry::from).collect()))
}
