//! One structured log line per HTTP request.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{error, info, warn};

use crate::auth::AuthenticatedUser;

/// Log method, path, status, latency and caller. The level follows the status:
/// 5xx as error, 4xx as warning, everything else as info.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();
    let user = response
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|u| u.user_id.to_string())
        .unwrap_or_else(|| "guest".to_string());

    if response.status().is_server_error() {
        error!(%method, path, status, latency_ms, user_id = %user, "Request failed");
    } else if response.status().is_client_error() {
        warn!(%method, path, status, latency_ms, user_id = %user, "Request rejected");
    } else {
        info!(%method, path, status, latency_ms, user_id = %user, "Request completed");
    }

    response
}
