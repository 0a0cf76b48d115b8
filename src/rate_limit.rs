//! Rate limiting for the credential endpoints (login and register).
//!
//! Token bucket per client IP, so one client cannot brute force passwords.

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use serde_json::json;
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc};
use tracing::warn;

/// Attempts per minute per IP when nothing else is configured.
pub const DEFAULT_CREDENTIAL_ATTEMPTS_PER_MINUTE: u32 = 10;

/// Key shared by requests without connection info (in-process tests).
const UNKNOWN_CLIENT: &str = "unknown";

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

#[derive(Clone)]
pub struct RateLimitConfig {
    pub credentials: Arc<IpLimiter>,
}

impl RateLimitConfig {
    /// Allow `per_minute` credential attempts per IP, with the same burst.
    /// Zero is treated as one.
    pub fn new(per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            credentials: Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CREDENTIAL_ATTEMPTS_PER_MINUTE)
    }
}

fn client_ip(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Middleware for rate limiting login and registration.
pub async fn rate_limit_credentials(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);

    match config.credentials.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            warn!(client_ip = %ip, path = %request.uri().path(), "Credential rate limit hit");
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "Too many attempts. Please wait before trying again."
                })),
            )
                .into_response()
        }
    }
}
