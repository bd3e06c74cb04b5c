//! FAQ API endpoints
//!
//! Reader (`/api/v1/faqs`):
//! - GET / - Published FAQs
//! - POST /{id}/feedback - Helpful / not helpful vote
//!
//! Admin (`/api/v1/admin/faqs`): full CRUD

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, ReaderIdentity, TenantContext};
use crate::models::{CreateFaqInput, Faq, FaqFeedbackResult, UpdateFaqInput};

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub helpful: bool,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_published_faqs))
        .route("/{id}/feedback", post(submit_feedback))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_faqs).post(create_faq))
        .route("/{id}", get(get_faq).put(update_faq).delete(delete_faq))
}

async fn list_published_faqs(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<Vec<Faq>>, ApiError> {
    Ok(Json(state.faq_service.list_published(tenant.id()).await?))
}

/// POST /api/v1/faqs/{id}/feedback
///
/// Anonymous readers vote under their session id.
async fn submit_feedback(
    State(state): State<AppState>,
    tenant: TenantContext,
    identity: ReaderIdentity,
    Path(id): Path<i64>,
    Json(body): Json<FeedbackRequest>,
) -> Result<Json<FaqFeedbackResult>, ApiError> {
    let result = state
        .faq_service
        .submit_feedback(
            tenant.id(),
            id,
            identity.user_id,
            Some(identity.session_id.as_str()),
            body.helpful,
        )
        .await?;
    Ok(Json(result))
}

async fn list_faqs(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<Vec<Faq>>, ApiError> {
    Ok(Json(state.faq_service.list(tenant.id()).await?))
}

async fn create_faq(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(input): Json<CreateFaqInput>,
) -> Result<(StatusCode, Json<Faq>), ApiError> {
    let faq = state.faq_service.create(tenant.id(), input).await?;
    Ok((StatusCode::CREATED, Json(faq)))
}

async fn get_faq(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
) -> Result<Json<Faq>, ApiError> {
    Ok(Json(state.faq_service.get(tenant.id(), id).await?))
}

async fn update_faq(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
    Json(input): Json<UpdateFaqInput>,
) -> Result<Json<Faq>, ApiError> {
    Ok(Json(state.faq_service.update(tenant.id(), id, input).await?))
}

async fn delete_faq(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.faq_service.delete(tenant.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
