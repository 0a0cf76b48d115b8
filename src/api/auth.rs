//! Authentication API endpoints.
//!
//! - POST `/register` - Create an account
//! - POST `/login` - Exchange email and password for a token pair
//! - POST `/refresh` - Rotate a refresh token
//! - POST `/logout` - End the session of one refresh token
//! - POST `/logout-all` - End every session of the token's owner

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, JsonBody};
use crate::auth::{AuthError, AuthService, TokenPair};
use crate::rate_limit::{RateLimitConfig, rate_limit_credentials};

const MIN_PASSWORD_LENGTH: usize = 6;
/// bcrypt only looks at the first 72 bytes
const MAX_PASSWORD_BYTES: usize = 72;
const MAX_EMAIL_LENGTH: usize = 254;

#[derive(Clone)]
pub struct AuthState {
    pub service: Arc<AuthService>,
}

pub fn router(state: AuthState, rate_limit: Arc<RateLimitConfig>) -> Router {
    let credentials = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            rate_limit,
            rate_limit_credentials,
        ));

    let sessions = Router::new()
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/logout-all", post(logout_all))
        .with_state(state);

    credentials.merge(sessions)
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), AuthError> {
        validate_email(self.email.trim())?;
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        if self.password.len() > MAX_PASSWORD_BYTES {
            return Err(AuthError::validation(format!(
                "Password cannot be longer than {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

impl LoginRequest {
    fn validate(&self) -> Result<(), AuthError> {
        validate_email(self.email.trim())?;
        if self.password.is_empty() {
            return Err(AuthError::validation("Password is required"));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    refresh_token: String,
}

impl RefreshRequest {
    fn token(&self) -> Result<&str, AuthError> {
        let token = self.refresh_token.trim();
        if token.is_empty() {
            return Err(AuthError::validation("Refresh token is required"));
        }
        Ok(token)
    }
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    if email.is_empty() {
        return Err(AuthError::validation("Email is required"));
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(AuthError::validation("Email is too long"));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AuthError::validation("Invalid email address"));
    }
    Ok(())
}

#[derive(Serialize)]
struct RegisterResponse {
    id: i64,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Serialize)]
struct LogoutAllResponse {
    message: &'static str,
    revoked: u64,
}

async fn register(
    State(state): State<AuthState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let id = state
        .service
        .register(req.email.trim(), &req.password)
        .await?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { id })))
}

async fn login(
    State(state): State<AuthState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    req.validate()?;

    let pair = state
        .service
        .sign_in(req.email.trim(), &req.password)
        .await?;

    Ok(Json(pair))
}

async fn refresh(
    State(state): State<AuthState>,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let token = req.token()?;
    let pair = state.service.refresh_tokens(token).await?;
    Ok(Json(pair))
}

async fn logout(
    State(state): State<AuthState>,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = req.token()?;
    let claims = state.service.validate_refresh_token(token).await?;
    state
        .service
        .logout_current_session(claims.user_id, token)
        .await?;

    Ok(Json(MessageResponse {
        message: "Logged out of current session",
    }))
}

async fn logout_all(
    State(state): State<AuthState>,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> Result<Json<LogoutAllResponse>, ApiError> {
    let token = req.token()?;
    let claims = state.service.validate_refresh_token(token).await?;
    let revoked = state.service.logout_all_sessions(claims.user_id).await?;

    Ok(Json(LogoutAllResponse {
        message: "Logged out of all sessions",
        revoked,
    }))
}
