//! Current user endpoint.
//!
//! - GET `/me` - Identity carried by the access token

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::auth::CurrentUser;

pub fn router() -> Router {
    Router::new().route("/me", get(me))
}

#[derive(Serialize)]
struct MeResponse {
    id: i64,
    email: String,
}

async fn me(CurrentUser(user): CurrentUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: user.user_id,
        email: user.email,
    })
}
