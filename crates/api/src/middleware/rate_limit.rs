//! Fixed-window rate limiting for the upload route.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::AppError;
use crate::state::AppState;

/// Reject requests beyond `rate_limit_max_requests` per client IP within
/// one `rate_limit_window_secs` window.
///
/// Counter store failures are logged and the request is admitted: the
/// limiter protects the conversion pipeline, it must not take the API
/// down with it.
pub async fn enforce(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client_ip = client_ip(&request);
    let key = format!("rate_limit:{client_ip}");

    match state
        .rate_limiter
        .incr_window(&key, state.config.rate_limit_window_secs)
        .await
    {
        Ok(count) if count > state.config.rate_limit_max_requests => {
            tracing::warn!(%client_ip, count, "Rate limit exceeded");
            return Err(AppError::RateLimited);
        }
        Ok(_) => {}
        Err(error) => {
            tracing::warn!(%client_ip, %error, "Rate-limit store unavailable, admitting");
        }
    }

    Ok(next.run(request).await)
}

/// Best-effort client address: first hop of `x-forwarded-for` when the
/// service runs behind a proxy, then the peer address, then a shared
/// bucket for transports without either.
fn client_ip(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    if let Some(ip) = forwarded {
        return ip;
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".into())
}
