pub mod auth;
mod categories;
mod error;
mod users;

use axum::{Router, middleware};
use std::sync::Arc;

use crate::auth::require_access_token;
use crate::db::Database;
use crate::jwt::JwtConfig;

pub use auth::AuthState;
pub use error::{ApiError, JsonBody, ResultExt};

/// Create the protected API router. Every route requires an access token.
pub fn create_api_router(db: Database, jwt: Arc<JwtConfig>) -> Router {
    let categories_state = categories::CategoriesState { db };

    Router::new()
        .merge(users::router())
        .nest("/categories", categories::router(categories_state))
        .route_layer(middleware::from_fn_with_state(jwt, require_access_token))
}
