//! Newsletter subscriber endpoints
//!
//! - POST /api/v1/subscribe
//! - POST /api/v1/unsubscribe
//! - GET /api/v1/admin/subscribers
//! - GET /api/v1/admin/subscribers/count
//! - DELETE /api/v1/admin/subscribers/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{default_page, default_per_page, SuccessResponse};
use crate::api::middleware::{ApiError, AppState, TenantContext};
use crate::models::{ListParams, PagedResult, SubscribeInput, Subscriber, SubscriberStatus};

#[derive(Debug, Deserialize)]
pub struct SubscribersQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub status: Option<SubscriberStatus>,
}

#[derive(Debug, Deserialize)]
pub struct CountQuery {
    pub status: Option<SubscriberStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/subscribe", post(subscribe))
        .route("/unsubscribe", post(unsubscribe))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subscribers))
        .route("/count", get(count_subscribers))
        .route("/{id}", delete(delete_subscriber))
}

/// POST /api/v1/subscribe
///
/// Subscribing an unsubscribed address reactivates it.
async fn subscribe(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(input): Json<SubscribeInput>,
) -> Result<(StatusCode, Json<Subscriber>), ApiError> {
    let subscriber = state.subscriber_service.subscribe(tenant.id(), input).await?;
    Ok((StatusCode::CREATED, Json(subscriber)))
}

async fn unsubscribe(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(body): Json<UnsubscribeRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .subscriber_service
        .unsubscribe(tenant.id(), &body.email)
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn list_subscribers(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<SubscribersQuery>,
) -> Result<Json<PagedResult<Subscriber>>, ApiError> {
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(
        state
            .subscriber_service
            .list(tenant.id(), query.status, &params)
            .await?,
    ))
}

async fn count_subscribers(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<CountQuery>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.subscriber_service.count(tenant.id(), query.status).await?;
    Ok(Json(CountResponse { count }))
}

async fn delete_subscriber(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.subscriber_service.delete(tenant.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
