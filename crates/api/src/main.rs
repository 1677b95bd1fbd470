use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imgconv_api::config::ServerConfig;
use imgconv_api::router::build_app_router;
use imgconv_api::state::AppState;
use imgconv_api::ws::WsManager;
use imgconv_core::ConversionConfig;
use imgconv_events::RedisEventSubscriber;
use imgconv_queue::{QueueConfig, RedisBroker, RedisCache, RedisRateLimitStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imgconv_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let conversion = ConversionConfig::from_env();
    conversion
        .ensure_dirs()
        .expect("Failed to create artifact directories");

    let queue_config = QueueConfig::from_env();

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = imgconv_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    imgconv_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    imgconv_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Redis ---
    let redis_client =
        redis::Client::open(queue_config.redis_url.as_str()).expect("Invalid REDIS_URL");
    let redis_conn = redis_client
        .get_connection_manager()
        .await
        .expect("Failed to connect to redis");
    tracing::info!("Redis connection established");

    // --- WebSocket manager ---
    let ws_manager = Arc::new(WsManager::new());

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        conversion: Arc::new(conversion),
        broker: Arc::new(RedisBroker::new(redis_conn.clone(), &queue_config)),
        cache: Arc::new(RedisCache::new(redis_conn.clone())),
        subscriber: Arc::new(RedisEventSubscriber::new(redis_client)),
        rate_limiter: Arc::new(RedisRateLimitStore::new(redis_conn)),
        ws_manager: Arc::clone(&ws_manager),
    };

    // --- Router ---
    let app = build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    // `ConnectInfo` feeds the rate limiter's peer-address fallback.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket sessions");
    ws_manager.shutdown_all().await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
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
