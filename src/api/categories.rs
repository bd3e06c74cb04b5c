//! Category API endpoints
//!
//! - GET /api/v1/categories - Categories of the current tenant
//! - GET, POST /api/v1/admin/categories
//! - GET, DELETE /api/v1/admin/categories/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, TenantContext};
use crate::models::{Category, CreateCategoryInput};

/// Response for category list
#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub categories: Vec<Category>,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(list_categories))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/{id}", get(get_category).delete(delete_category))
}

async fn list_categories(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<CategoryListResponse>, ApiError> {
    let categories = state.category_service.list(tenant.id()).await?;
    Ok(Json(CategoryListResponse { categories }))
}

async fn create_category(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(input): Json<CreateCategoryInput>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.category_service.create(tenant.id(), input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn get_category(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.category_service.get(tenant.id(), id).await?))
}

async fn delete_category(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.category_service.delete(tenant.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
