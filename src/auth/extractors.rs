//! Access guard middleware and the extractor handlers use behind it.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use super::errors::AuthError;
use super::service::parse_access_token;
use super::types::AuthenticatedUser;
use crate::jwt::JwtConfig;

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::Unauthorized("Missing authorization header"))?
        .to_str()
        .map_err(|_| AuthError::Unauthorized("Invalid authorization header format"))?;
    if value.is_empty() {
        return Err(AuthError::Unauthorized("Missing authorization header"));
    }

    let parts: Vec<&str> = value.split(' ').collect();
    let [scheme, token] = parts.as_slice() else {
        return Err(AuthError::Unauthorized(
            "Invalid authorization header format",
        ));
    };
    if *scheme != "Bearer" {
        return Err(AuthError::Unauthorized(
            "Authorization scheme must be Bearer",
        ));
    }
    if token.is_empty() {
        return Err(AuthError::Unauthorized(
            "Invalid authorization header format",
        ));
    }

    Ok(*token)
}

/// Reject requests without a valid access token. On success the caller's
/// identity is attached to the request, and to the response for request logging.
pub async fn require_access_token(
    State(jwt): State<Arc<JwtConfig>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(request.headers())?;
    let claims = parse_access_token(&jwt, token)?;

    let user = AuthenticatedUser {
        user_id: claims.user_id,
        email: claims.email,
    };
    request.extensions_mut().insert(user.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(user);
    Ok(response)
}

/// Identity of the caller, available to handlers behind [`require_access_token`].
pub struct CurrentUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                AuthError::internal("read authenticated user", "access guard not installed")
            })
    }
}
