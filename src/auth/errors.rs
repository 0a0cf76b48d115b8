//! Authentication error types.

use std::fmt::Display;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Errors produced by the session lifecycle and the access guard.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(String),
    /// Authorization header missing or malformed.
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid token")]
    InvalidToken,
    #[error("token revoked")]
    TokenRevoked,
    #[error("refresh session expired")]
    TokenExpired,
    #[error("user not found")]
    NotFound,
    #[error("email already registered")]
    Conflict,
    #[error("{context}: {detail}")]
    Internal { context: &'static str, detail: String },
}

impl AuthError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Wrap a store or driver failure with the operation that hit it.
    pub fn internal(context: &'static str, e: impl Display) -> Self {
        Self::Internal {
            context,
            detail: e.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Unauthorized(_)
            | AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::TokenRevoked
            | AuthError::TokenExpired
            | AuthError::NotFound => StatusCode::UNAUTHORIZED,
            AuthError::Conflict => StatusCode::CONFLICT,
            AuthError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients. Internal detail is never included.
    pub fn message(&self) -> String {
        match self {
            AuthError::Validation(msg) => msg.clone(),
            AuthError::Unauthorized(msg) => (*msg).to_string(),
            AuthError::InvalidCredentials => "Invalid email or password".into(),
            AuthError::InvalidToken => "Invalid or expired token".into(),
            AuthError::TokenRevoked => "Token has been revoked".into(),
            AuthError::TokenExpired => "Refresh session has expired".into(),
            AuthError::NotFound => "User not found".into(),
            AuthError::Conflict => "Email is already registered".into(),
            AuthError::Internal { .. } => "Internal server error".into(),
        }
    }

    /// Log internal failures before they are turned into a response.
    pub fn log_if_internal(&self) {
        if let AuthError::Internal { context, detail } = self {
            error!(context, error = %detail, "Internal error");
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log_if_internal();
        let status = self.status_code();
        (
            status,
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::NotFound.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AuthError::internal("create user", "disk full").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_detail_hidden() {
        let err = AuthError::internal("create user", "disk full");
        assert_eq!(err.message(), "Internal server error");
        assert_eq!(err.to_string(), "create user: disk full");
    }
}
