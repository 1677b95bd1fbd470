use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imgconv_core::ConversionConfig;
use imgconv_events::RedisEventPublisher;
use imgconv_queue::{QueueConfig, RedisBroker, RedisCache};
use imgconv_worker::{Worker, WorkerConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imgconv_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let conversion = ConversionConfig::from_env();
    conversion
        .ensure_dirs()
        .expect("Failed to create artifact directories");

    let queue_config = QueueConfig::from_env();
    let worker_config = WorkerConfig::from_env();
    tracing::info!(
        concurrency = worker_config.concurrency,
        queue = %queue_config.queue_key,
        "Loaded worker configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = imgconv_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");

    imgconv_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    // --- Redis ---
    let redis_client =
        redis::Client::open(queue_config.redis_url.as_str()).expect("Invalid REDIS_URL");
    let redis_conn = redis_client
        .get_connection_manager()
        .await
        .expect("Failed to connect to redis");
    tracing::info!("Redis connection established");

    let broker = Arc::new(RedisBroker::new(redis_conn.clone(), &queue_config));
    let cache = Arc::new(RedisCache::new(redis_conn.clone()));
    let publisher = Arc::new(RedisEventPublisher::new(redis_conn));

    // Re-queue tasks stranded in-flight by a previous crash.
    broker
        .recover()
        .await
        .expect("Failed to recover in-flight tasks");

    // --- Consume loops ---
    let worker = Arc::new(Worker::new(
        pool,
        broker,
        cache,
        publisher,
        conversion,
    ));

    let cancel = tokio_util::sync::CancellationToken::new();
    let mut handles = Vec::with_capacity(worker_config.concurrency);
    for _ in 0..worker_config.concurrency {
        let worker = Arc::clone(&worker);
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            worker.run(cancel).await;
        }));
    }

    shutdown_signal().await;

    // --- Graceful shutdown ---
    cancel.cancel();
    for handle in handles {
        let _ = tokio::time::timeout(Duration::from_secs(30), handle).await;
    }
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the worker
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
