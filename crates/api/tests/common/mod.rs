#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;

use imgconv_api::config::ServerConfig;
use imgconv_api::router::build_app_router;
use imgconv_api::state::AppState;
use imgconv_api::ws::WsManager;
use imgconv_core::ConversionConfig;
use imgconv_events::EventBus;
use imgconv_queue::{Broker, MemoryBroker, MemoryCache, MemoryRateLimitStore};

/// Build a test `ServerConfig` with safe defaults and a rate limit high
/// enough to stay out of the way unless a test lowers it.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        rate_limit_window_secs: 60,
        rate_limit_max_requests: 1000,
    }
}

/// A fully wired application over in-memory queue components, with
/// handles kept for assertions.
pub struct TestApp {
    pub app: Router,
    pub broker: Arc<MemoryBroker>,
    pub cache: Arc<MemoryCache>,
    pub bus: EventBus,
    pub conversion: Arc<ConversionConfig>,
    pub ws_manager: Arc<WsManager>,
    _tmp: TempDir,
}

pub struct TestAppBuilder {
    pool: PgPool,
    config: ServerConfig,
    max_file_size: u64,
    broker_override: Option<Arc<dyn Broker>>,
}

impl TestAppBuilder {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            config: test_config(),
            max_file_size: 10_000_000,
            broker_override: None,
        }
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn max_requests(mut self, requests: u64) -> Self {
        self.config.rate_limit_max_requests = requests;
        self
    }

    /// Replace the broker, e.g. with one that fails on enqueue.
    pub fn broker(mut self, broker: Arc<dyn Broker>) -> Self {
        self.broker_override = Some(broker);
        self
    }

    pub fn build(self) -> TestApp {
        let tmp = tempfile::tempdir().unwrap();
        let conversion = Arc::new(ConversionConfig {
            upload_dir: tmp.path().join("uploads"),
            converted_dir: tmp.path().join("converted"),
            max_file_size: self.max_file_size,
            allowed_formats: vec![
                "jpg".into(),
                "jpeg".into(),
                "png".into(),
                "gif".into(),
                "webp".into(),
            ],
        });
        conversion.ensure_dirs().unwrap();

        let broker = Arc::new(MemoryBroker::default());
        let cache = Arc::new(MemoryCache::new());
        let bus = EventBus::new();
        let ws_manager = Arc::new(WsManager::new());

        let state = AppState {
            pool: self.pool,
            config: Arc::new(self.config),
            conversion: Arc::clone(&conversion),
            broker: self
                .broker_override
                .unwrap_or_else(|| Arc::clone(&broker) as Arc<dyn Broker>),
            cache: Arc::clone(&cache) as Arc<dyn imgconv_queue::StatusCache>,
            subscriber: Arc::new(bus.clone()),
            rate_limiter: Arc::new(MemoryRateLimitStore::new()),
            ws_manager: Arc::clone(&ws_manager),
        };

        TestApp {
            app: build_app_router(state),
            broker,
            cache,
            bus,
            conversion,
            ws_manager,
            _tmp: tmp,
        }
    }
}

/// Build the default test application for tests with no overrides.
pub fn build_test_app(pool: PgPool) -> TestApp {
    TestAppBuilder::new(pool).build()
}

/// Issue a GET request against the router.
pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Decode a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Multipart helpers
// ---------------------------------------------------------------------------

pub const BOUNDARY: &str = "imgconv-test-boundary";

pub enum Part<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        bytes: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

/// Build a `multipart/form-data` POST request from raw parts.
pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                name,
                filename,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// A small opaque PNG, encoded in memory.
pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(6, 6, image::Rgb([40, 90, 200]));
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// A small JPEG, encoded in memory.
pub fn jpeg_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(6, 6, image::Rgb([200, 90, 40]));
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Jpeg)
        .unwrap();
    buf.into_inner()
}
