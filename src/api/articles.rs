//! Article API endpoints
//!
//! Admin (`/api/v1/admin/articles`):
//! - GET / - List articles with filters
//! - POST / - Create article
//! - GET, PUT, DELETE /{id}
//! - POST /bulk-delete, POST /bulk-status
//! - GET /export - CSV export
//! - GET /{id}/seo, GET /{id}/versions, POST /{id}/versions/{version_id}/restore
//! - PUT /{id}/tags, PUT /{id}/related, PUT /{id}/faqs
//!
//! Reader (`/api/v1/articles`):
//! - GET / - Published articles
//! - GET /{slug} - Published article with related records
//!
//! Editor form: `POST /api/articles/publish`

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::common::{
    default_page, default_page_size, default_per_page, AffectedResponse, IdsRequest, SuccessResponse,
};
use crate::api::middleware::{ApiError, AppState, TenantContext};
use crate::models::{
    Article, ArticleDetail, ArticleFilter, ArticleStatus, ArticleSummary, ArticleVersion,
    CreateArticleInput, ListParams, PagedResult, Tag, UpdateArticleInput,
};
use crate::services::{PublishForm, SeoAnalysis, ServiceError};

/// Admin list filters
#[derive(Debug, Deserialize)]
pub struct AdminArticlesQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub status: Option<ArticleStatus>,
    pub client_id: Option<i64>,
    pub category_id: Option<i64>,
    pub author_id: Option<i64>,
    pub search: Option<String>,
}

impl AdminArticlesQuery {
    fn filter(&self) -> ArticleFilter {
        ArticleFilter {
            status: self.status,
            client_id: self.client_id,
            category_id: self.category_id,
            author_id: self.author_id,
            search: self.search.clone(),
        }
    }
}

/// Reader list filters
#[derive(Debug, Deserialize)]
pub struct PublishedArticlesQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    pub category_id: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkStatusRequest {
    pub ids: Vec<i64>,
    pub status: ArticleStatus,
}

#[derive(Debug, Deserialize)]
pub struct TagsRequest {
    pub tags: Vec<String>,
}

/// Body of the editor's publish action
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    #[serde(rename = "formData")]
    pub form_data: PublishForm,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ArticleStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PublishResponse {
    fn failure(status: StatusCode, error: impl Into<String>) -> Response {
        let body = Self {
            success: false,
            article_id: None,
            status: None,
            error: Some(error.into()),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the admin article router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_articles).post(create_article))
        .route("/export", get(export_articles))
        .route("/bulk-delete", post(bulk_delete_articles))
        .route("/bulk-status", post(bulk_update_status))
        .route("/{id}", get(get_article).put(update_article).delete(delete_article))
        .route("/{id}/seo", get(get_seo_analysis))
        .route("/{id}/versions", get(list_versions))
        .route("/{id}/versions/{version_id}/restore", post(restore_version))
        .route("/{id}/tags", put(set_tags))
        .route("/{id}/related", put(set_related))
        .route("/{id}/faqs", put(set_faqs))
}

/// Build the reader article router
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_published_articles))
        .route("/{slug}", get(get_published_article))
}

/// GET /api/v1/admin/articles
async fn list_articles(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<AdminArticlesQuery>,
) -> Result<Json<PagedResult<Article>>, ApiError> {
    let params = ListParams::new(query.page, query.per_page);
    let result = state
        .article_service
        .list(tenant.id(), &query.filter(), &params)
        .await?;
    Ok(Json(result))
}

/// POST /api/v1/admin/articles
async fn create_article(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(input): Json<CreateArticleInput>,
) -> Result<(StatusCode, Json<Article>), ApiError> {
    let article = state.article_service.create(tenant.id(), input).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

/// GET /api/v1/admin/articles/{id}
async fn get_article(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.article_service.get(tenant.id(), id).await?))
}

/// PUT /api/v1/admin/articles/{id}
async fn update_article(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
    Json(input): Json<UpdateArticleInput>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.article_service.update(tenant.id(), id, input).await?))
}

/// DELETE /api/v1/admin/articles/{id}
async fn delete_article(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.article_service.delete(tenant.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/articles/bulk-delete
async fn bulk_delete_articles(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(body): Json<IdsRequest>,
) -> Result<Json<AffectedResponse>, ApiError> {
    let affected = state.article_service.bulk_delete(tenant.id(), &body.ids).await?;
    Ok(Json(AffectedResponse { affected }))
}

/// POST /api/v1/admin/articles/bulk-status
async fn bulk_update_status(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(body): Json<BulkStatusRequest>,
) -> Result<Json<AffectedResponse>, ApiError> {
    let affected = state
        .article_service
        .bulk_update_status(tenant.id(), &body.ids, body.status)
        .await?;
    Ok(Json(AffectedResponse { affected }))
}

/// GET /api/v1/admin/articles/export
async fn export_articles(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<AdminArticlesQuery>,
) -> Result<Response, ApiError> {
    let csv = state
        .export_service
        .export_articles_csv(tenant.id(), &query.filter())
        .await?;
    let disposition = format!(
        "attachment; filename=\"articles-{}.csv\"",
        Utc::now().format("%Y-%m-%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

/// GET /api/v1/admin/articles/{id}/seo
async fn get_seo_analysis(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
) -> Result<Json<SeoAnalysis>, ApiError> {
    Ok(Json(state.article_service.seo_analysis(tenant.id(), id).await?))
}

/// GET /api/v1/admin/articles/{id}/versions
async fn list_versions(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ArticleVersion>>, ApiError> {
    Ok(Json(state.article_service.list_versions(tenant.id(), id).await?))
}

/// POST /api/v1/admin/articles/{id}/versions/{version_id}/restore
async fn restore_version(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path((id, version_id)): Path<(i64, i64)>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(
        state
            .article_service
            .restore_version(tenant.id(), id, version_id)
            .await?,
    ))
}

/// PUT /api/v1/admin/articles/{id}/tags
async fn set_tags(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
    Json(body): Json<TagsRequest>,
) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.article_service.set_tags(tenant.id(), id, &body.tags).await?))
}

/// PUT /api/v1/admin/articles/{id}/related
async fn set_related(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
    Json(body): Json<IdsRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.article_service.set_related(tenant.id(), id, &body.ids).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// PUT /api/v1/admin/articles/{id}/faqs
async fn set_faqs(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<i64>,
    Json(body): Json<IdsRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.article_service.set_faqs(tenant.id(), id, &body.ids).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/v1/articles
async fn list_published_articles(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<PublishedArticlesQuery>,
) -> Result<Json<PagedResult<ArticleSummary>>, ApiError> {
    let params = ListParams::new(query.page, query.page_size);
    let filter = ArticleFilter {
        status: Some(ArticleStatus::Published),
        category_id: query.category_id,
        search: query.search,
        ..Default::default()
    };
    let result = state.article_service.list(tenant.id(), &filter, &params).await?;
    let items = result.items.iter().map(Article::summary).collect();
    Ok(Json(PagedResult::new(items, result.total, &params)))
}

/// GET /api/v1/articles/{slug}
async fn get_published_article(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(slug): Path<String>,
) -> Result<Json<ArticleDetail>, ApiError> {
    Ok(Json(
        state
            .article_service
            .get_published_by_slug(tenant.id(), &slug)
            .await?,
    ))
}

/// POST /api/articles/publish
///
/// Creates or updates the article from the editor form, then publishes it or
/// schedules it for a future `scheduledAt`.
pub async fn publish_article(
    State(state): State<AppState>,
    tenant: TenantContext,
    body: Result<Json<PublishRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return PublishResponse::failure(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    match state
        .article_service
        .publish_from_form(tenant.id(), request.form_data)
        .await
    {
        Ok(outcome) => Json(PublishResponse {
            success: true,
            article_id: Some(outcome.article_id),
            status: Some(outcome.status),
            error: None,
        })
        .into_response(),
        Err(ServiceError::Internal(e)) => {
            tracing::error!("Publish failed: {:#}", e);
            PublishResponse::failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to publish article")
        }
        Err(e) => PublishResponse::failure(StatusCode::BAD_REQUEST, e.to_string()),
    }
}
