//! Category API endpoints. All routes require an access token.
//!
//! - GET `/` - List own and global categories
//! - POST `/` - Create a category
//! - GET `/{id}` - Get one visible category
//! - PUT `/{id}` - Rename or re-icon an own category
//! - DELETE `/{id}` - Delete an own category

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, JsonBody, ResultExt, parse_id};
use crate::auth::CurrentUser;
use crate::db::{Category, CategoryKind, Database};
use crate::session::{STORE_DEADLINE, with_deadline};

const MAX_NAME_LENGTH: usize = 64;
const MAX_ICON_LENGTH: usize = 32;

#[derive(Clone)]
pub struct CategoriesState {
    pub db: Database,
}

pub fn router(state: CategoriesState) -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        .with_state(state)
}

#[derive(Deserialize)]
struct CreateCategoryRequest {
    name: String,
    kind: CategoryKind,
    icon: Option<String>,
}

#[derive(Deserialize)]
struct UpdateCategoryRequest {
    name: Option<String>,
    icon: Option<String>,
}

#[derive(Serialize)]
struct ListCategoriesResponse {
    categories: Vec<Category>,
}

#[derive(Serialize)]
struct CreateCategoryResponse {
    id: i64,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.is_empty() {
        return Err(ApiError::bad_request("Name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Name cannot be longer than {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

fn validate_icon(icon: &str) -> Result<(), ApiError> {
    if icon.chars().count() > MAX_ICON_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Icon cannot be longer than {} characters",
            MAX_ICON_LENGTH
        )));
    }
    Ok(())
}

async fn list_categories(
    State(state): State<CategoriesState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ListCategoriesResponse>, ApiError> {
    let categories = with_deadline(
        STORE_DEADLINE,
        state.db.categories().list_for_user(user.user_id),
    )
    .await
    .db_err("Failed to list categories")?;

    Ok(Json(ListCategoriesResponse { categories }))
}

async fn create_category(
    State(state): State<CategoriesState>,
    CurrentUser(user): CurrentUser,
    JsonBody(req): JsonBody<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim();
    validate_name(name)?;
    if let Some(icon) = &req.icon {
        validate_icon(icon)?;
    }

    let id = with_deadline(
        STORE_DEADLINE,
        state
            .db
            .categories()
            .create(user.user_id, name, req.kind, req.icon.as_deref()),
    )
    .await
    .db_err("Failed to create category")?;

    Ok((StatusCode::CREATED, Json(CreateCategoryResponse { id })))
}

async fn get_category(
    State(state): State<CategoriesState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Category>, ApiError> {
    let id = parse_id(&id)?;

    let category = with_deadline(
        STORE_DEADLINE,
        state.db.categories().get_for_user(user.user_id, id),
    )
    .await
    .db_err("Failed to get category")?
    .ok_or_else(|| ApiError::not_found("Category not found"))?;

    Ok(Json(category))
}

async fn update_category(
    State(state): State<CategoriesState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateCategoryRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = parse_id(&id)?;
    let name = req.name.as_deref().map(str::trim);

    if name.is_none() && req.icon.is_none() {
        return Err(ApiError::bad_request("Nothing to update"));
    }
    if let Some(name) = name {
        validate_name(name)?;
    }
    if let Some(icon) = &req.icon {
        validate_icon(icon)?;
    }

    let updated = with_deadline(
        STORE_DEADLINE,
        state
            .db
            .categories()
            .update(user.user_id, id, name, req.icon.as_deref()),
    )
    .await
    .db_err("Failed to update category")?;

    if !updated {
        return Err(ApiError::not_found("Category not found"));
    }

    Ok(Json(StatusResponse { status: "ok" }))
}

async fn delete_category(
    State(state): State<CategoriesState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = parse_id(&id)?;

    let deleted = with_deadline(
        STORE_DEADLINE,
        state.db.categories().delete(user.user_id, id),
    )
    .await
    .db_err("Failed to delete category")?;

    if !deleted {
        return Err(ApiError::not_found("Category not found"));
    }

    Ok(Json(StatusResponse { status: "ok" }))
}
