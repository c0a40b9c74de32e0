//! Per-request access log.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, info, warn};

/// Logs method, path, query, status and latency. Health probes log at
/// debug level so they do not drown out folder traffic.
pub async fn request_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let query = request.uri().query().unwrap_or_default().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;

    if response.status().is_server_error() {
        warn!(%method, %path, %query, status, latency_ms, "Request failed");
    } else if path.starts_with("/api/health") {
        debug!(%method, %path, status, latency_ms, "Health probe");
    } else {
        info!(%method, %path, %query, status, latency_ms, "Request served");
    }

    response
}
