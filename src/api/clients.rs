//! Client and subscription tier endpoints
//!
//! Under `/api/v1/admin`:
//! - GET, POST /clients
//! - GET, PUT, DELETE /clients/{id}
//! - PUT /clients/{id}/tier - Assign a tier
//! - GET /clients/{id}/usage - Article usage this month
//! - GET, POST /tiers
//! - GET, PUT, DELETE /tiers/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_page, default_per_page};
use crate::api::middleware::{ApiError, AppState, TenantContext};
use crate::models::{
    Client, ClientFilter, ClientStatus, ClientUsage, CreateClientInput, CreateTierInput, ListParams,
    PagedResult, SubscriptionTier, UpdateClientInput, UpdateTierInput,
};

#[derive(Debug, Deserialize)]
pub struct ClientsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub status: Option<ClientStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TiersQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct AssignTierRequest {
    pub tier_id: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/clients", get(list_clients).post(create_client))
        .route(
            "/clients/{id}",
            get(get_client).put(update_client).delete(delete_client),
        )
        .route("/clients/{id}/tier", put(assign_tier))
        .route("/clients/{id}/usage", get(get_usage))
        .route("/tiers", get(list_tiers).post(create_tier))
        .route("/tiers/{id}", get(get_tier).put(update_tier).delete(delete_tier))
}

async fn list_clients(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ClientsQuery>,
) -> Result<Json<PagedResult<Client>>, ApiError> {
    let params = ListParams::new(query.page, query.per_page);
    let filter = ClientFilter {
        status: query.status,
        search: query.search,
    };
    Ok(Json(state.client_service.list(tenant.id(), &filter, &params).await?))
}

async fn create_client(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(input): Json<CreateClientInput>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let client = state.client_service.create(tenant.id(), input).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

async fn get_client(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
) -> Result<Json<Client>, ApiError> {
    Ok(Json(state.client_service.get(tenant.id(), id).await?))
}

async fn update_client(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
    Json(input): Json<UpdateClientInput>,
) -> Result<Json<Client>, ApiError> {
    Ok(Json(state.client_service.update(tenant.id(), id, input).await?))
}

async fn delete_client(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.client_service.delete(tenant.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn assign_tier(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
    Json(body): Json<AssignTierRequest>,
) -> Result<Json<Client>, ApiError> {
    Ok(Json(
        state
            .client_service
            .assign_tier(tenant.id(), id, body.tier_id)
            .await?,
    ))
}

async fn get_usage(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
) -> Result<Json<ClientUsage>, ApiError> {
    Ok(Json(state.client_service.usage(tenant.id(), id).await?))
}

async fn list_tiers(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<TiersQuery>,
) -> Result<Json<Vec<SubscriptionTier>>, ApiError> {
    Ok(Json(state.tier_service.list(tenant.id(), query.active_only).await?))
}

async fn create_tier(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(input): Json<CreateTierInput>,
) -> Result<(StatusCode, Json<SubscriptionTier>), ApiError> {
    let tier = state.tier_service.create(tenant.id(), input).await?;
    Ok((StatusCode::CREATED, Json(tier)))
}

async fn get_tier(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
) -> Result<Json<SubscriptionTier>, ApiError> {
    Ok(Json(state.tier_service.get(tenant.id(), id).await?))
}

async fn update_tier(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
    Json(input): Json<UpdateTierInput>,
) -> Result<Json<SubscriptionTier>, ApiError> {
    Ok(Json(state.tier_service.update(tenant.id(), id, input).await?))
}

async fn delete_tier(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.tier_service.delete(tenant.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
