//! Repository for the `conversion_jobs` table.
//!
//! Every state transition is a single guarded UPDATE: the `WHERE status`
//! clause enforces the state machine at the store boundary, so a terminal
//! row can never be mutated and `processing` can only be entered from
//! `queued`. Each method reports via its return value whether the
//! transition actually happened.

use sqlx::PgPool;

use imgconv_core::types::JobId;
use imgconv_core::ConversionStatus;

use crate::models::job::Job;

/// Column list for `conversion_jobs` queries.
const COLUMNS: &str = "\
    id, input_path, output_path, status, output_format, error_message, \
    created_at, updated_at";

/// Provides CRUD operations and guarded state transitions for jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new job in `queued` status and return the row.
    pub async fn create(
        pool: &PgPool,
        id: JobId,
        input_path: &str,
        output_format: &str,
    ) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO conversion_jobs (id, input_path, status, output_format) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(input_path)
            .bind(ConversionStatus::Queued.as_str())
            .bind(output_format)
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: JobId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM conversion_jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Transition `queued -> processing`.
    ///
    /// Returns `false` when the job is not currently `queued` (already
    /// picked up, or terminal), leaving the row untouched.
    pub async fn mark_processing(pool: &PgPool, id: JobId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE conversion_jobs \
             SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND status = $3",
        )
        .bind(id)
        .bind(ConversionStatus::Processing.as_str())
        .bind(ConversionStatus::Queued.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Transition `processing -> completed` and record the output artifact.
    ///
    /// Returns `false` when the job is not currently `processing`.
    pub async fn complete(
        pool: &PgPool,
        id: JobId,
        output_path: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE conversion_jobs \
             SET status = $2, output_path = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $4",
        )
        .bind(id)
        .bind(ConversionStatus::Completed.as_str())
        .bind(output_path)
        .bind(ConversionStatus::Processing.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Transition `processing -> failed` and record the error text.
    ///
    /// Returns `false` when the job is not currently `processing`.
    pub async fn fail(pool: &PgPool, id: JobId, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE conversion_jobs \
             SET status = $2, error_message = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $4",
        )
        .bind(id)
        .bind(ConversionStatus::Failed.as_str())
        .bind(error)
        .bind(ConversionStatus::Processing.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List all jobs, newest first.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM conversion_jobs ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Job>(&query).fetch_all(pool).await
    }

    /// Delete a job row. Used by ingress to roll back a partially admitted
    /// submission when the broker hand-off fails.
    pub async fn delete(pool: &PgPool, id: JobId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM conversion_jobs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
