pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::middleware::rate_limit;
use crate::state::AppState;
use crate::ws;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /convert             submit a multipart batch (POST, rate limited)
/// /status/{job_id}     poll one job's status
/// /jobs                list all jobs, newest first
/// /ws                  WebSocket status relay
/// ```
pub fn api_routes(state: AppState) -> Router<AppState> {
    let convert = Router::new()
        .route("/convert", post(handlers::convert::upload_images))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            rate_limit::enforce,
        ));

    Router::new()
        .merge(convert)
        .route("/status/{job_id}", get(handlers::jobs::get_status))
        .route("/jobs", get(handlers::jobs::list_jobs))
        .route("/ws", get(ws::ws_handler))
}
