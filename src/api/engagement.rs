//! Reader engagement endpoints
//!
//! Reader (`/api/v1`):
//! - GET /comments/{article_id} - Approved comment threads
//! - POST /comments/{article_id} - Post a comment or reply
//! - GET, POST /likes/{article_id} - Like state / toggle
//! - POST /favorites/{article_id} - Toggle favorite
//! - GET /favorites - Caller's favorites
//! - POST /views/{article_id} - Record a view
//!
//! Admin (`/api/v1/admin/comments`): moderation queue

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{default_page, default_per_page, PaginationQuery, SuccessResponse};
use crate::api::middleware::{ApiError, AppState, ReaderIdentity, TenantContext};
use crate::models::{
    ArticleSummary, Comment, CommentStatus, CommentThread, CreateCommentInput, FavoriteResult,
    LikeResult, ListParams, PagedResult,
};

#[derive(Debug, Deserialize)]
pub struct CommentsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub status: Option<CommentStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ModerateRequest {
    pub status: CommentStatus,
}

#[derive(Debug, Serialize)]
pub struct LikeStatusResponse {
    pub liked: bool,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/comments/{article_id}", get(list_threads).post(create_comment))
        .route("/likes/{article_id}", get(like_status).post(toggle_like))
        .route("/favorites", get(list_favorites))
        .route("/favorites/{article_id}", post(toggle_favorite))
        .route("/views/{article_id}", post(record_view))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_comments))
        .route("/{id}", put(moderate_comment).delete(delete_comment))
}

async fn list_threads(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(article_id): Path<i64>,
) -> Result<Json<Vec<CommentThread>>, ApiError> {
    Ok(Json(
        state
            .engagement_service
            .comment_threads(tenant.id(), article_id)
            .await?,
    ))
}

async fn create_comment(
    State(state): State<AppState>,
    tenant: TenantContext,
    identity: ReaderIdentity,
    Path(article_id): Path<i64>,
    Json(input): Json<CreateCommentInput>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let user_id = identity.require_user()?;
    let comment = state
        .engagement_service
        .create_comment(tenant.id(), article_id, user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /api/v1/likes/{article_id}
///
/// Anonymous readers never have a like.
async fn like_status(
    State(state): State<AppState>,
    tenant: TenantContext,
    identity: ReaderIdentity,
    Path(article_id): Path<i64>,
) -> Result<Json<LikeStatusResponse>, ApiError> {
    let liked = match identity.user_id {
        Some(user_id) => {
            state
                .engagement_service
                .is_liked(tenant.id(), article_id, user_id)
                .await?
        }
        None => false,
    };
    Ok(Json(LikeStatusResponse { liked }))
}

async fn toggle_like(
    State(state): State<AppState>,
    tenant: TenantContext,
    identity: ReaderIdentity,
    Path(article_id): Path<i64>,
) -> Result<Json<LikeResult>, ApiError> {
    let user_id = identity.require_user()?;
    Ok(Json(
        state
            .engagement_service
            .toggle_like(tenant.id(), article_id, user_id)
            .await?,
    ))
}

async fn toggle_favorite(
    State(state): State<AppState>,
    tenant: TenantContext,
    identity: ReaderIdentity,
    Path(article_id): Path<i64>,
) -> Result<Json<FavoriteResult>, ApiError> {
    let user_id = identity.require_user()?;
    Ok(Json(
        state
            .engagement_service
            .toggle_favorite(tenant.id(), article_id, user_id)
            .await?,
    ))
}

async fn list_favorites(
    State(state): State<AppState>,
    tenant: TenantContext,
    identity: ReaderIdentity,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResult<ArticleSummary>>, ApiError> {
    let user_id = identity.require_user()?;
    Ok(Json(
        state
            .engagement_service
            .list_favorites(tenant.id(), user_id, &query.params())
            .await?,
    ))
}

/// POST /api/v1/views/{article_id}
///
/// The visitor is the reader's session; the referrer comes from `Referer`.
async fn record_view(
    State(state): State<AppState>,
    tenant: TenantContext,
    identity: ReaderIdentity,
    headers: HeaderMap,
    Path(article_id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let referrer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok());
    state
        .article_service
        .record_view(tenant.id(), article_id, Some(identity.session_id.as_str()), referrer)
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn list_comments(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<CommentsQuery>,
) -> Result<Json<PagedResult<Comment>>, ApiError> {
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(
        state
            .engagement_service
            .list_comments(tenant.id(), query.status, &params)
            .await?,
    ))
}

async fn moderate_comment(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
    Json(body): Json<ModerateRequest>,
) -> Result<Json<Comment>, ApiError> {
    Ok(Json(
        state
            .engagement_service
            .moderate_comment(tenant.id(), id, body.status)
            .await?,
    ))
}

async fn delete_comment(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.engagement_service.delete_comment(tenant.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
