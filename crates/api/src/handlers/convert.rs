//! Upload ingress: validate, persist, create, seed, enqueue.
//!
//! Validation of the whole batch happens before any side effect; a single
//! bad file rejects the entire call with 400 and leaves no trace. After a
//! file is admitted, a failed store insert or broker hand-off rolls back
//! the artifact and the row before surfacing 500.

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use imgconv_core::error::CoreError;
use imgconv_core::types::JobId;
use imgconv_core::{formats, ConversionStatus};
use imgconv_db::repositories::JobRepo;
use imgconv_queue::{job_status_key, ConvertTask};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// One admitted file in the upload response.
#[derive(Debug, Serialize)]
pub struct SubmittedJob {
    pub job_id: JobId,
    /// The client's original filename, echoed back for display.
    pub filename: String,
    pub status: ConversionStatus,
}

/// Response payload for the upload endpoint.
#[derive(Debug, Serialize)]
pub struct ConversionResponse {
    pub success: bool,
    pub jobs: Vec<SubmittedJob>,
}

/// A file part held in memory between validation and admission.
struct PendingUpload {
    filename: String,
    extension: String,
    bytes: Bytes,
}

/// POST /api/convert
///
/// Accept a multipart batch of image files plus an `output_format` field
/// and an optional `session_id` field, and create one queued job per file.
pub async fn upload_images(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<ConversionResponse>> {
    let mut output_format: Option<String> = None;
    let mut session_id: Option<String> = None;
    let mut uploads: Vec<PendingUpload> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("files") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                // Extension is validated below, with the rest of the batch.
                let extension = formats::source_extension(&filename).unwrap_or_default();
                uploads.push(PendingUpload {
                    filename,
                    extension,
                    bytes,
                });
            }
            Some("output_format") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                output_format = Some(value.trim().to_ascii_lowercase());
            }
            Some("session_id") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                let value = value.trim().to_string();
                if !value.is_empty() {
                    session_id = Some(value);
                }
            }
            _ => {}
        }
    }

    // -- Validation phase: no side effects until the whole batch passes. --

    let output_format = output_format
        .ok_or_else(|| AppError::BadRequest("Missing output_format field".into()))?;
    if !formats::is_allowed(&output_format, &state.conversion.allowed_formats) {
        return Err(CoreError::InvalidFormat(output_format).into());
    }

    if uploads.is_empty() {
        return Err(AppError::BadRequest("No files provided".into()));
    }

    for upload in &uploads {
        if !formats::is_allowed(&upload.extension, &state.conversion.allowed_formats) {
            return Err(CoreError::InvalidFormat(upload.extension.clone()).into());
        }
        let size = upload.bytes.len() as u64;
        if size > state.conversion.max_file_size {
            return Err(CoreError::TooLarge {
                size,
                limit: state.conversion.max_file_size,
            }
            .into());
        }
    }

    // -- Admission phase. --

    let mut jobs = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let job = admit(&state, &output_format, session_id.as_deref(), upload).await?;
        jobs.push(job);
    }

    Ok(Json(ConversionResponse {
        success: true,
        jobs,
    }))
}

/// Admit one validated file: persist the artifact, create the job row,
/// seed the status cache, and enqueue the conversion task.
async fn admit(
    state: &AppState,
    output_format: &str,
    session_id: Option<&str>,
    upload: PendingUpload,
) -> AppResult<SubmittedJob> {
    let job_id = uuid::Uuid::new_v4();
    let stored_name = format!("{job_id}.{}", upload.extension);
    let artifact_path = state.conversion.upload_dir.join(&stored_name);

    tokio::fs::write(&artifact_path, &upload.bytes)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to persist upload: {e}")))?;

    let job = match JobRepo::create(&state.pool, job_id, &stored_name, output_format).await {
        Ok(job) => job,
        Err(error) => {
            let _ = tokio::fs::remove_file(&artifact_path).await;
            return Err(error.into());
        }
    };

    // Cache seed is advisory; readers fall back to the store on a miss.
    if let Err(error) = state
        .cache
        .set(&job_status_key(job_id), &job.to_snapshot())
        .await
    {
        tracing::warn!(job_id = %job_id, %error, "Status cache seed failed");
    }

    let task = ConvertTask::new(job_id, output_format, session_id.map(str::to_string));
    if let Err(error) = state.broker.enqueue(&task).await {
        tracing::error!(job_id = %job_id, %error, "Broker enqueue failed, rolling back");
        let _ = JobRepo::delete(&state.pool, job_id).await;
        let _ = tokio::fs::remove_file(&artifact_path).await;
        return Err(AppError::Queue(error));
    }

    tracing::info!(
        job_id = %job_id,
        filename = %upload.filename,
        output_format = %output_format,
        "Conversion job queued",
    );

    Ok(SubmittedJob {
        job_id,
        filename: upload.filename,
        status: job.status,
    })
}
