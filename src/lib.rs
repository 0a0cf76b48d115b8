pub mod api;
pub mod auth;
pub mod cache;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod duration;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod request_log;
pub mod session;

use api::{AuthState, create_api_router};
use auth::AuthService;
use axum::{Json, Router, middleware, routing::get};
use cache::SessionCache;
use db::Database;
use jwt::{JwtConfig, TokenLifetimes};
use password::CredentialVerifier;
use rate_limit::RateLimitConfig;
use request_log::log_requests;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Fast store for refresh session markers
    pub cache: Arc<dyn SessionCache>,
    /// Secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Access and refresh token lifetimes
    pub lifetimes: TokenLifetimes,
    /// Password hasher
    pub verifier: CredentialVerifier,
    /// Login and register attempts allowed per client IP per minute
    pub login_rate_per_minute: u32,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(&config.jwt_secret, config.lifetimes));

    let service = Arc::new(AuthService::new(
        config.db.clone(),
        config.cache.clone(),
        jwt.clone(),
        config.verifier.clone(),
    ));
    let rate_limit = Arc::new(RateLimitConfig::new(config.login_rate_per_minute));

    Router::new()
        .route("/health", get(health))
        .nest("/auth", api::auth::router(AuthState { service }, rate_limit))
        .nest("/api", create_api_router(config.db.clone(), jwt))
        .layer(middleware::from_fn(log_requests))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Run cleanup tasks. Call this before starting the server.
pub async fn init_cleanup(db: &Database) {
    cleanup::run_cleanup(db).await;
}

/// Run the server on the given listener until SIGINT or SIGTERM.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
