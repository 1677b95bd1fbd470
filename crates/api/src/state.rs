use std::sync::Arc;

use imgconv_core::ConversionConfig;
use imgconv_events::EventSubscriber;
use imgconv_queue::{Broker, RateLimitStore, StatusCache};

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`). The broker,
/// cache, subscriber, and rate limiter are trait objects so the binary
/// wires the redis implementations while tests use the in-memory ones.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: imgconv_db::DbPool,
    /// Server configuration (bind address, CORS, timeouts, rate limits).
    pub config: Arc<ServerConfig>,
    /// File-handling configuration (artifact dirs, size limit, allow-list).
    pub conversion: Arc<ConversionConfig>,
    /// Task queue the ingress hands conversions to.
    pub broker: Arc<dyn Broker>,
    /// Advisory status cache consulted before the job store.
    pub cache: Arc<dyn StatusCache>,
    /// Event source the WebSocket relay subscribes sessions to.
    pub subscriber: Arc<dyn EventSubscriber>,
    /// Counter store backing the rate-limit middleware.
    pub rate_limiter: Arc<dyn RateLimitStore>,
    /// WebSocket connection manager.
    pub ws_manager: Arc<WsManager>,
}
