//! The worker run loop and per-delivery state machine.
//!
//! Ordering within a delivery is fixed: persist the transition first, then
//! refresh the cache, then publish the event, then settle the delivery
//! with the broker. The job store is authoritative; cache and publish
//! failures are logged and never undo a persisted transition.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use imgconv_core::{convert, ConversionConfig, ConversionStatus, CoreError, StatusSnapshot};
use imgconv_db::repositories::JobRepo;
use imgconv_events::{job_channel, session_channel, EventPublisher, StatusEvent};
use imgconv_queue::{job_status_key, Broker, ConvertTask, Delivery, StatusCache};

/// Pause after a broker error before polling again.
const CONSUME_RETRY_DELAY: Duration = Duration::from_secs(1);

/// One consumer of the conversion queue.
///
/// Cheap to construct; the binary spawns one `run` loop per configured
/// concurrency slot over a shared `Arc<Worker>`.
pub struct Worker {
    pool: PgPool,
    broker: Arc<dyn Broker>,
    cache: Arc<dyn StatusCache>,
    publisher: Arc<dyn EventPublisher>,
    conversion: ConversionConfig,
}

impl Worker {
    pub fn new(
        pool: PgPool,
        broker: Arc<dyn Broker>,
        cache: Arc<dyn StatusCache>,
        publisher: Arc<dyn EventPublisher>,
        conversion: ConversionConfig,
    ) -> Self {
        Self {
            pool,
            broker,
            cache,
            publisher,
            conversion,
        }
    }

    /// Consume deliveries until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!("Conversion worker started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Conversion worker shutting down");
                    break;
                }
                consumed = self.broker.consume() => {
                    match consumed {
                        Ok(Some(delivery)) => {
                            if let Err(error) = self.handle_delivery(&delivery).await {
                                tracing::error!(
                                    job_id = %delivery.task.job_id,
                                    %error,
                                    "Delivery handling failed, rejecting",
                                );
                                self.reject_logged(&delivery).await;
                            }
                        }
                        // Poll timeout elapsed with nothing to do.
                        Ok(None) => {}
                        Err(error) => {
                            tracing::error!(%error, "Broker consume failed");
                            tokio::time::sleep(CONSUME_RETRY_DELAY).await;
                        }
                    }
                }
            }
        }
    }

    /// Process one delivery end to end, including settling it with the
    /// broker.
    ///
    /// Errors escape only from job-store operations that happen before the
    /// delivery is settled; the caller rejects in that case so the retry
    /// policy engages.
    pub async fn handle_delivery(&self, delivery: &Delivery) -> Result<(), sqlx::Error> {
        let task = &delivery.task;

        let Some(job) = JobRepo::find_by_id(&self.pool, task.job_id).await? else {
            tracing::warn!(job_id = %task.job_id, "Task references an unknown job, rejecting");
            self.reject_logged(delivery).await;
            return Ok(());
        };

        // Idempotency guard: a re-delivered task whose job already reached
        // a terminal state is dropped without touching the row again.
        if job.status.is_terminal() {
            tracing::info!(
                job_id = %job.id,
                status = %job.status,
                "Job already terminal, dropping re-delivery",
            );
            self.ack_logged(delivery).await;
            return Ok(());
        }

        // A job still in `processing` here was stranded by a crashed
        // worker and recovered; resume it rather than re-transition.
        if job.status == ConversionStatus::Queued
            && !JobRepo::mark_processing(&self.pool, job.id).await?
        {
            // Lost the race to another consumer of the same delivery.
            tracing::warn!(job_id = %job.id, "Job was picked up concurrently, rejecting");
            self.reject_logged(delivery).await;
            return Ok(());
        }

        let mut processing = job.to_snapshot();
        processing.status = ConversionStatus::Processing;
        self.announce(task, &processing).await;

        let input = self.conversion.upload_dir.join(&job.input_path);
        let output_name = format!("{}.{}", job.id, job.output_format);
        let output = self.conversion.converted_dir.join(&output_name);
        let output_format = job.output_format.clone();

        let converted = tokio::task::spawn_blocking(move || {
            convert::convert(&input, &output, &output_format)
        })
        .await
        .unwrap_or_else(|join_error| Err(CoreError::Internal(join_error.to_string())));

        match converted {
            Ok(()) => {
                JobRepo::complete(&self.pool, job.id, &output_name).await?;
                self.announce_current(task).await;
                self.ack_logged(delivery).await;
                tracing::info!(job_id = %job.id, output = %output_name, "Conversion completed");
            }
            Err(error) => {
                JobRepo::fail(&self.pool, job.id, &error.to_string()).await?;
                self.announce_current(task).await;
                self.reject_logged(delivery).await;
                tracing::warn!(job_id = %job.id, %error, "Conversion failed");
            }
        }

        Ok(())
    }

    /// Re-read the row and announce its snapshot, so cache and event carry
    /// exactly what the store persisted.
    async fn announce_current(&self, task: &ConvertTask) {
        match JobRepo::find_by_id(&self.pool, task.job_id).await {
            Ok(Some(job)) => self.announce(task, &job.to_snapshot()).await,
            Ok(None) => {
                tracing::warn!(job_id = %task.job_id, "Job disappeared before announcement");
            }
            Err(error) => {
                tracing::warn!(job_id = %task.job_id, %error, "Snapshot re-read failed");
            }
        }
    }

    /// Best-effort cache refresh and event publish for a snapshot.
    async fn announce(&self, task: &ConvertTask, snapshot: &StatusSnapshot) {
        let key = job_status_key(task.job_id);
        if let Err(error) = self.cache.set(&key, snapshot).await {
            tracing::warn!(job_id = %task.job_id, %error, "Status cache write failed");
        }

        let event = StatusEvent::from_snapshot(task.job_id, task.session_id.clone(), snapshot);

        if let Err(error) = self
            .publisher
            .publish(&job_channel(task.job_id), &event)
            .await
        {
            tracing::warn!(job_id = %task.job_id, %error, "Job channel publish failed");
        }

        if let Some(session_id) = &task.session_id {
            if let Err(error) = self
                .publisher
                .publish(&session_channel(session_id), &event)
                .await
            {
                tracing::warn!(
                    job_id = %task.job_id,
                    %session_id,
                    %error,
                    "Session channel publish failed",
                );
            }
        }
    }

    async fn ack_logged(&self, delivery: &Delivery) {
        if let Err(error) = self.broker.ack(delivery).await {
            tracing::error!(job_id = %delivery.task.job_id, %error, "Broker ack failed");
        }
    }

    async fn reject_logged(&self, delivery: &Delivery) {
        if let Err(error) = self.broker.reject(delivery).await {
            tracing::error!(job_id = %delivery.task.job_id, %error, "Broker reject failed");
        }
    }
}
