//! Integration tests for status polling and job listing.

mod common;

use axum::http::StatusCode;
use common::{body_json, get};
use sqlx::PgPool;

use imgconv_core::{ConversionStatus, StatusSnapshot};
use imgconv_db::repositories::JobRepo;
use imgconv_queue::{job_status_key, StatusCache};

#[sqlx::test(migrations = "../db/migrations")]
async fn status_prefers_the_cache_over_the_store(pool: PgPool) {
    let h = common::build_test_app(pool.clone());
    let job_id = uuid::Uuid::new_v4();
    JobRepo::create(&pool, job_id, &format!("{job_id}.png"), "jpeg")
        .await
        .unwrap();

    // Seed the cache with a snapshot ahead of the row, as the worker does.
    let snapshot = StatusSnapshot {
        status: ConversionStatus::Processing,
        input_path: format!("/uploads/{job_id}.png"),
        output_path: None,
        output_format: "jpeg".into(),
        error: None,
    };
    h.cache
        .set(&job_status_key(job_id), &snapshot)
        .await
        .unwrap();

    let response = get(h.app, &format!("/api/status/{job_id}")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "processing");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn status_falls_back_to_the_store_on_cache_miss(pool: PgPool) {
    let h = common::build_test_app(pool.clone());
    let job_id = uuid::Uuid::new_v4();
    JobRepo::create(&pool, job_id, &format!("{job_id}.png"), "webp")
        .await
        .unwrap();

    let response = get(h.app, &format!("/api/status/{job_id}")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "queued");
    assert_eq!(json["input_path"], format!("/uploads/{job_id}.png"));
    assert_eq!(json["output_format"], "webp");
    assert!(json["output_path"].is_null());
    assert!(json["error"].is_null());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn status_of_unknown_job_is_404(pool: PgPool) {
    let h = common::build_test_app(pool);

    let response = get(h.app, &format!("/api/status/{}", uuid::Uuid::new_v4())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn listing_returns_jobs_newest_first(pool: PgPool) {
    let h = common::build_test_app(pool.clone());

    let older = uuid::Uuid::new_v4();
    JobRepo::create(&pool, older, &format!("{older}.png"), "jpeg")
        .await
        .unwrap();
    let newer = uuid::Uuid::new_v4();
    JobRepo::create(&pool, newer, &format!("{newer}.gif"), "png")
        .await
        .unwrap();

    let response = get(h.app, "/api/jobs").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let jobs = json.as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["job_id"], newer.to_string());
    assert_eq!(jobs[1]["job_id"], older.to_string());
    assert_eq!(jobs[0]["status"], "queued");
    assert!(jobs[0]["created_at"].is_string());
    assert_eq!(jobs[0]["input_path"], format!("/uploads/{newer}.gif"));
}
