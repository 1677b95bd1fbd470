//! Integration tests for the upload ingress.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::{body_json, jpeg_bytes, multipart_request, png_bytes, Part};
use sqlx::PgPool;
use tower::ServiceExt;

use imgconv_core::ConversionStatus;
use imgconv_db::repositories::JobRepo;
use imgconv_queue::{
    job_status_key, Broker, ConvertTask, Delivery, QueueError, QueueResult, StatusCache,
};

fn upload_parts<'a>(png: &'a [u8], output_format: &'a str) -> Vec<Part<'a>> {
    vec![
        Part::File {
            name: "files",
            filename: "photo.png",
            bytes: png,
        },
        Part::Text {
            name: "output_format",
            value: output_format,
        },
    ]
}

/// Count the entries in a directory.
fn dir_len(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[sqlx::test(migrations = "../db/migrations")]
async fn upload_queues_a_job_per_file(pool: PgPool) {
    let h = common::build_test_app(pool.clone());
    let png = png_bytes();

    let response = h
        .app
        .oneshot(multipart_request("/api/convert", &upload_parts(&png, "jpeg")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["jobs"].as_array().unwrap().len(), 1);
    assert_eq!(json["jobs"][0]["filename"], "photo.png");
    assert_eq!(json["jobs"][0]["status"], "queued");

    let job_id: uuid::Uuid = json["jobs"][0]["job_id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();

    // Row persisted in queued status with the stored artifact name.
    let job = JobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.status, ConversionStatus::Queued);
    assert_eq!(job.input_path, format!("{job_id}.png"));
    assert_eq!(job.output_format, "jpeg");

    // Artifact written under the upload directory.
    assert!(h.conversion.upload_dir.join(format!("{job_id}.png")).is_file());

    // Cache seeded with the queued snapshot.
    let cached = h.cache.get(&job_status_key(job_id)).await.unwrap().unwrap();
    assert_eq!(cached.status, ConversionStatus::Queued);
    assert_eq!(cached.input_path, format!("/uploads/{job_id}.png"));

    // Task enqueued without a session.
    let delivery = h.broker.consume().await.unwrap().unwrap();
    assert_eq!(delivery.task.job_id, job_id);
    assert_eq!(delivery.task.output_format, "jpeg");
    assert_eq!(delivery.task.session_id, None);
    assert_eq!(delivery.task.attempts, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn batch_upload_creates_independent_jobs(pool: PgPool) {
    let h = common::build_test_app(pool.clone());
    let png = png_bytes();
    let jpeg = jpeg_bytes();
    let parts = vec![
        Part::File {
            name: "files",
            filename: "first.png",
            bytes: &png,
        },
        Part::File {
            name: "files",
            filename: "second.jpg",
            bytes: &jpeg,
        },
        Part::File {
            name: "files",
            filename: "third.png",
            bytes: &png,
        },
        Part::Text {
            name: "output_format",
            value: "webp",
        },
    ];

    let response = h
        .app
        .oneshot(multipart_request("/api/convert", &parts))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let jobs = json["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 3);

    // One job per file, echoed in submission order.
    let expected = [("first.png", "png"), ("second.jpg", "jpg"), ("third.png", "png")];
    let mut job_ids = std::collections::HashSet::new();
    for (entry, (filename, extension)) in jobs.iter().zip(expected) {
        assert_eq!(entry["filename"], *filename);
        assert_eq!(entry["status"], "queued");

        let job_id: uuid::Uuid = entry["job_id"].as_str().unwrap().parse().unwrap();
        assert!(job_ids.insert(job_id), "job ids must be distinct");

        // Each row carries its own artifact name and the shared target.
        let job = JobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
        assert_eq!(job.status, ConversionStatus::Queued);
        assert_eq!(job.input_path, format!("{job_id}.{extension}"));
        assert_eq!(job.output_format, "webp");
        assert!(h
            .conversion
            .upload_dir
            .join(format!("{job_id}.{extension}"))
            .is_file());
    }

    // One broker task per job, nothing shared between them.
    assert_eq!(h.broker.ready_len().await, 3);
    for _ in 0..3 {
        let delivery = h.broker.consume().await.unwrap().unwrap();
        assert!(job_ids.remove(&delivery.task.job_id));
        assert_eq!(delivery.task.output_format, "webp");
    }
    assert!(job_ids.is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn session_id_field_tags_the_task(pool: PgPool) {
    let h = common::build_test_app(pool);
    let png = png_bytes();
    let mut parts = upload_parts(&png, "webp");
    parts.push(Part::Text {
        name: "session_id",
        value: "sess-9",
    });

    let response = h
        .app
        .oneshot(multipart_request("/api/convert", &parts))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let delivery = h.broker.consume().await.unwrap().unwrap();
    assert_eq!(delivery.task.session_id.as_deref(), Some("sess-9"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unsupported_output_format_rejects_whole_call(pool: PgPool) {
    let h = common::build_test_app(pool.clone());
    let png = png_bytes();

    let response = h
        .app
        .oneshot(multipart_request("/api/convert", &upload_parts(&png, "bmp")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNSUPPORTED_FORMAT");

    // No side effects at all.
    assert!(JobRepo::list_all(&pool).await.unwrap().is_empty());
    assert_eq!(h.broker.ready_len().await, 0);
    assert_eq!(dir_len(&h.conversion.upload_dir), 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn one_bad_file_rejects_the_whole_batch(pool: PgPool) {
    let h = common::build_test_app(pool.clone());
    let png = png_bytes();
    let parts = vec![
        Part::File {
            name: "files",
            filename: "good.png",
            bytes: &png,
        },
        Part::File {
            name: "files",
            filename: "notes.txt",
            bytes: b"not an image",
        },
        Part::Text {
            name: "output_format",
            value: "jpeg",
        },
    ];

    let response = h
        .app
        .oneshot(multipart_request("/api/convert", &parts))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The valid file was not admitted either.
    assert!(JobRepo::list_all(&pool).await.unwrap().is_empty());
    assert_eq!(h.broker.ready_len().await, 0);
    assert_eq!(dir_len(&h.conversion.upload_dir), 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn oversized_file_is_rejected(pool: PgPool) {
    let h = common::TestAppBuilder::new(pool.clone())
        .max_file_size(64)
        .build();
    let png = png_bytes();
    assert!(png.len() > 64);

    let response = h
        .app
        .oneshot(multipart_request("/api/convert", &upload_parts(&png, "jpeg")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "FILE_TOO_LARGE");
    assert!(JobRepo::list_all(&pool).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn missing_output_format_is_a_bad_request(pool: PgPool) {
    let h = common::build_test_app(pool);
    let png = png_bytes();
    let parts = vec![Part::File {
        name: "files",
        filename: "photo.png",
        bytes: &png,
    }];

    let response = h
        .app
        .oneshot(multipart_request("/api/convert", &parts))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

/// Broker whose enqueue always fails, for exercising ingress rollback.
struct FailingBroker;

#[async_trait]
impl Broker for FailingBroker {
    async fn enqueue(&self, _task: &ConvertTask) -> QueueResult<()> {
        Err(QueueError::from(
            serde_json::from_str::<u8>("broken").unwrap_err(),
        ))
    }

    async fn consume(&self) -> QueueResult<Option<Delivery>> {
        Ok(None)
    }

    async fn ack(&self, _delivery: &Delivery) -> QueueResult<()> {
        Ok(())
    }

    async fn reject(&self, _delivery: &Delivery) -> QueueResult<()> {
        Ok(())
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn enqueue_failure_rolls_back_row_and_artifact(pool: PgPool) {
    let h = common::TestAppBuilder::new(pool.clone())
        .broker(Arc::new(FailingBroker))
        .build();
    let png = png_bytes();

    let response = h
        .app
        .oneshot(multipart_request("/api/convert", &upload_parts(&png, "jpeg")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // The partially admitted submission was rolled back.
    assert!(JobRepo::list_all(&pool).await.unwrap().is_empty());
    assert_eq!(dir_len(&h.conversion.upload_dir), 0);
}
