//! Job row model.

use imgconv_core::snapshot::{converted_url, uploads_url};
use imgconv_core::types::{JobId, Timestamp};
use imgconv_core::{ConversionStatus, StatusSnapshot};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `conversion_jobs` table.
///
/// `status` is decoded through [`ConversionStatus::parse`]; a row holding
/// an unknown status value fails to decode rather than leaking through.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: JobId,
    /// Source artifact path relative to the upload directory (`{id}.{ext}`).
    pub input_path: String,
    /// Converted artifact path relative to the converted directory;
    /// set iff the job completed.
    pub output_path: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ConversionStatus,
    pub output_format: String,
    /// Human-readable failure reason; set iff the job failed.
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    /// Derive the cache/polling snapshot for this row.
    pub fn to_snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            status: self.status,
            input_path: uploads_url(&self.input_path),
            output_path: self.output_path.as_deref().map(converted_url),
            output_format: self.output_format.clone(),
            error: self.error_message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn job(status: ConversionStatus) -> Job {
        Job {
            id: Uuid::new_v4(),
            input_path: "a.png".into(),
            output_path: None,
            status,
            output_format: "jpeg".into(),
            error_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn snapshot_prefixes_artifact_paths() {
        let mut row = job(ConversionStatus::Completed);
        row.output_path = Some("a.jpeg".into());

        let snapshot = row.to_snapshot();
        assert_eq!(snapshot.input_path, "/uploads/a.png");
        assert_eq!(snapshot.output_path.as_deref(), Some("/converted/a.jpeg"));
    }

    #[test]
    fn snapshot_of_queued_job_has_no_output() {
        let snapshot = job(ConversionStatus::Queued).to_snapshot();
        assert_eq!(snapshot.status, ConversionStatus::Queued);
        assert!(snapshot.output_path.is_none());
        assert!(snapshot.error.is_none());
    }
}
