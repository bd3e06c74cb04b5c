//! Admin API endpoints
//!
//! Handles HTTP requests under `/api/v1/admin`:
//! - GET /dashboard - Headline stats with trends
//! - GET /dashboard/status - Articles per status
//! - GET /dashboard/top-articles - Most viewed articles
//! - GET /dashboard/views - Daily view series
//! - GET /dashboard/clients - Clients per tier
//! - GET, POST /tenants

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, TenantContext};
use crate::models::{
    CreateTenantInput, DailyViews, DashboardStats, StatusCount, Tenant, TierBreakdown, TopArticle,
};

#[derive(Debug, Deserialize)]
pub struct TopArticlesQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct ViewsQuery {
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_limit() -> i64 {
    10
}

fn default_days() -> u32 {
    30
}

/// Build the admin dashboard and tenant router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/status", get(get_articles_by_status))
        .route("/dashboard/top-articles", get(get_top_articles))
        .route("/dashboard/views", get(get_views_over_time))
        .route("/dashboard/clients", get(get_client_breakdown))
        .route("/tenants", get(list_tenants).post(create_tenant))
}

/// GET /api/v1/admin/dashboard
///
/// Never fails: unavailable stats are reported as zeros.
async fn get_dashboard(State(state): State<AppState>, tenant: TenantContext) -> Json<DashboardStats> {
    Json(state.dashboard_service.stats_or_default(tenant.id()).await)
}

/// GET /api/v1/admin/dashboard/status
async fn get_articles_by_status(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<Vec<StatusCount>>, ApiError> {
    Ok(Json(state.dashboard_service.articles_by_status(tenant.id()).await?))
}

/// GET /api/v1/admin/dashboard/top-articles
async fn get_top_articles(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<TopArticlesQuery>,
) -> Result<Json<Vec<TopArticle>>, ApiError> {
    Ok(Json(
        state
            .dashboard_service
            .top_articles(tenant.id(), query.limit)
            .await?,
    ))
}

/// GET /api/v1/admin/dashboard/views
async fn get_views_over_time(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ViewsQuery>,
) -> Result<Json<Vec<DailyViews>>, ApiError> {
    Ok(Json(
        state
            .dashboard_service
            .views_over_time(tenant.id(), query.days)
            .await?,
    ))
}

/// GET /api/v1/admin/dashboard/clients
async fn get_client_breakdown(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<Vec<TierBreakdown>>, ApiError> {
    Ok(Json(state.dashboard_service.client_breakdown(tenant.id()).await?))
}

/// GET /api/v1/admin/tenants
async fn list_tenants(State(state): State<AppState>) -> Result<Json<Vec<Tenant>>, ApiError> {
    Ok(Json(state.tenant_service.list().await?))
}

/// POST /api/v1/admin/tenants
async fn create_tenant(
    State(state): State<AppState>,
    Json(input): Json<CreateTenantInput>,
) -> Result<(StatusCode, Json<Tenant>), ApiError> {
    let tenant = state.tenant_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(tenant)))
}
