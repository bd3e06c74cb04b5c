//! User and social endpoints
//!
//! Reader (`/api/v1`):
//! - GET /users/{username} - Public profile
//! - GET /users/{username}/followers, GET /users/{username}/following
//! - PUT /profile - Update the caller's profile
//! - POST, DELETE /follows/{user_id} - Follow / unfollow
//!
//! Admin (`/api/v1/admin/users`): list and create

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;

use crate::api::common::{AdminPaginationQuery, PaginationQuery};
use crate::api::middleware::{ApiError, AppState, ReaderIdentity, TenantContext};
use crate::models::{CreateUserInput, PagedResult, UpdateProfileInput, User, UserProfile, UserSummary};

#[derive(Debug, Serialize)]
pub struct FollowResponse {
    pub following: bool,
    /// False when the call was a repeat
    pub changed: bool,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/users/{username}", get(get_profile))
        .route("/users/{username}/followers", get(list_followers))
        .route("/users/{username}/following", get(list_following))
        .route("/profile", put(update_profile))
        .route("/follows/{user_id}", post(follow).delete(unfollow))
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/", get(list_users).post(create_user))
}

async fn get_profile(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(username): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.user_service.get_profile(tenant.id(), &username).await?))
}

async fn list_followers(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(username): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let profile = state.user_service.get_profile(tenant.id(), &username).await?;
    Ok(Json(
        state
            .user_service
            .list_followers(tenant.id(), profile.id, &query.params())
            .await?,
    ))
}

async fn list_following(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(username): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let profile = state.user_service.get_profile(tenant.id(), &username).await?;
    Ok(Json(
        state
            .user_service
            .list_following(tenant.id(), profile.id, &query.params())
            .await?,
    ))
}

async fn update_profile(
    State(state): State<AppState>,
    tenant: TenantContext,
    identity: ReaderIdentity,
    Json(input): Json<UpdateProfileInput>,
) -> Result<Json<UserProfile>, ApiError> {
    let user_id = identity.require_user()?;
    Ok(Json(
        state
            .user_service
            .update_profile(tenant.id(), user_id, input)
            .await?,
    ))
}

async fn follow(
    State(state): State<AppState>,
    tenant: TenantContext,
    identity: ReaderIdentity,
    Path(user_id): Path<i64>,
) -> Result<Json<FollowResponse>, ApiError> {
    let follower_id = identity.require_user()?;
    let changed = state
        .user_service
        .follow(tenant.id(), follower_id, user_id)
        .await?;
    Ok(Json(FollowResponse {
        following: true,
        changed,
    }))
}

async fn unfollow(
    State(state): State<AppState>,
    tenant: TenantContext,
    identity: ReaderIdentity,
    Path(user_id): Path<i64>,
) -> Result<Json<FollowResponse>, ApiError> {
    let follower_id = identity.require_user()?;
    let changed = state
        .user_service
        .unfollow(tenant.id(), follower_id, user_id)
        .await?;
    Ok(Json(FollowResponse {
        following: false,
        changed,
    }))
}

async fn list_users(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<AdminPaginationQuery>,
) -> Result<Json<PagedResult<User>>, ApiError> {
    Ok(Json(state.user_service.list(tenant.id(), &query.params()).await?))
}

async fn create_user(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(input): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.user_service.create(tenant.id(), input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
