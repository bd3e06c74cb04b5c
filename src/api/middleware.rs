//! API middleware and request context
//!
//! Contains:
//! - `AppState` with the shared services
//! - `ApiError`, the JSON error body returned by every endpoint
//! - `TenantContext`, resolved from the `X-Tenant` header
//! - `ReaderIdentity`, the caller's user id or anonymous session

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::MemoryCache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxAnalyticsRepository, SqlxArticleRepository, SqlxCategoryRepository, SqlxClientRepository,
    SqlxCommentRepository, SqlxEngagementRepository, SqlxFaqRepository, SqlxSubscriberRepository,
    SqlxTagRepository, SqlxTenantRepository, SqlxTierRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::Tenant;
use crate::services::{
    ArticleService, CategoryService, ClientService, DashboardService, EngagementService,
    ExportService, FaqService, ServiceError, SubscriberService, TenantService, TierService,
    UserService,
};

/// Header selecting the tenant
pub const TENANT_HEADER: &str = "x-tenant";
/// Header carrying the signed-in user's id
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying an anonymous reader session id
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub cache: Arc<MemoryCache>,
    pub default_tenant: Arc<str>,
    pub tenant_service: Arc<TenantService>,
    pub tier_service: Arc<TierService>,
    pub client_service: Arc<ClientService>,
    pub subscriber_service: Arc<SubscriberService>,
    pub user_service: Arc<UserService>,
    pub category_service: Arc<CategoryService>,
    pub article_service: Arc<ArticleService>,
    pub faq_service: Arc<FaqService>,
    pub engagement_service: Arc<EngagementService>,
    pub dashboard_service: Arc<DashboardService>,
    pub export_service: Arc<ExportService>,
}

impl AppState {
    /// Wire repositories and services over one pool and cache
    pub fn new(pool: DynDatabasePool, cache: Arc<MemoryCache>, config: &Config) -> Self {
        let article_repo = SqlxArticleRepository::boxed(pool.clone());
        let tier_repo = SqlxTierRepository::boxed(pool.clone());
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let faq_repo = SqlxFaqRepository::boxed(pool.clone());
        let subscriber_repo = SqlxSubscriberRepository::boxed(pool.clone());

        let client_service = Arc::new(ClientService::new(
            SqlxClientRepository::boxed(pool.clone()),
            tier_repo.clone(),
            cache.clone(),
        ));
        let article_service = Arc::new(ArticleService::new(
            article_repo.clone(),
            SqlxTagRepository::boxed(pool.clone()),
            category_repo.clone(),
            user_repo.clone(),
            faq_repo.clone(),
            client_service.clone(),
            cache.clone(),
        ));
        let engagement_service = Arc::new(EngagementService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxEngagementRepository::boxed(pool.clone()),
            article_repo.clone(),
            user_repo.clone(),
            cache.clone(),
            config.engagement.comment_moderation,
        ));
        let dashboard_service = Arc::new(DashboardService::new(
            SqlxAnalyticsRepository::boxed(pool.clone()),
            subscriber_repo.clone(),
            cache.clone(),
            config.dashboard.trend_window_days,
        ));

        Self {
            tenant_service: Arc::new(TenantService::new(
                SqlxTenantRepository::boxed(pool.clone()),
                cache.clone(),
            )),
            tier_service: Arc::new(TierService::new(tier_repo, cache.clone())),
            client_service,
            subscriber_service: Arc::new(SubscriberService::new(subscriber_repo, cache.clone())),
            user_service: Arc::new(UserService::new(user_repo)),
            category_service: Arc::new(CategoryService::new(category_repo, cache.clone())),
            article_service,
            faq_service: Arc::new(FaqService::new(faq_repo, cache.clone())),
            engagement_service,
            dashboard_service,
            export_service: Arc::new(ExportService::new(article_repo)),
            default_tenant: Arc::from(config.tenancy.default_tenant.as_str()),
            pool,
            cache,
        }
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(_) => ApiError::not_found(err.to_string()),
            ServiceError::Validation(msg) => ApiError::validation_error(msg),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
            ServiceError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Tenant the request operates on
///
/// Taken from the `X-Tenant` header, or the configured default tenant.
#[derive(Debug, Clone)]
pub struct TenantContext(pub Tenant);

impl TenantContext {
    pub fn id(&self) -> i64 {
        self.0.id
    }
}

impl FromRequestParts<AppState> for TenantContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let slug = tenant_slug(&parts.headers).unwrap_or_else(|| state.default_tenant.to_string());
        let tenant = state.tenant_service.resolve(&slug).await.map_err(|e| match e {
            ServiceError::NotFound(_) => ApiError::not_found(format!("Unknown tenant: {}", slug)),
            other => other.into(),
        })?;
        Ok(Self(tenant))
    }
}

fn tenant_slug(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Who is calling: a signed-in user and/or an anonymous session
///
/// Without an `X-Session-Id` header the session falls back to a fingerprint
/// of the client address and user agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderIdentity {
    pub user_id: Option<i64>,
    pub session_id: String,
}

impl ReaderIdentity {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let user_id = header_str(headers, USER_ID_HEADER).and_then(|v| v.parse().ok());
        let session_id = header_str(headers, SESSION_ID_HEADER)
            .map(str::to_string)
            .unwrap_or_else(|| {
                let ip = client_ip(headers).unwrap_or_else(|| "unknown".to_string());
                let user_agent = header_str(headers, "user-agent").unwrap_or("");
                generate_fingerprint(&ip, user_agent)
            });
        Self { user_id, session_id }
    }

    /// The user id, or a validation error for anonymous callers
    pub fn require_user(&self) -> Result<i64, ApiError> {
        self.user_id
            .ok_or_else(|| ApiError::validation_error("This action requires an X-User-Id header"))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ReaderIdentity {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// First address in `X-Forwarded-For`, else `X-Real-IP`
fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "x-forwarded-for")
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| header_str(headers, "x-real-ip").map(str::to_string))
}

/// Stable anonymous id from IP and User-Agent
pub fn generate_fingerprint(ip: &str, user_agent: &str) -> String {
    let data = format!("{}:{}", ip, user_agent);
    format!("{:x}", md5::compute(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_service_errors_map_to_status() {
        let cases = [
            (ServiceError::not_found("Article"), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (ServiceError::validation("bad"), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (ServiceError::conflict("dup"), StatusCode::CONFLICT, "CONFLICT"),
            (
                ServiceError::Internal(anyhow::anyhow!("db down")),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status(), status);
            assert_eq!(api.error.code, code);
        }
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let api: ApiError = ServiceError::Internal(anyhow::anyhow!("secret dsn")).into();
        assert!(!api.error.message.contains("secret"));
    }

    #[test]
    fn test_error_body_omits_empty_details() {
        let json = serde_json::to_value(ApiError::not_found("x")).unwrap();
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert!(json["error"].get("details").is_none());

        let json = serde_json::to_value(ApiError::with_details("VALIDATION_ERROR", "x", serde_json::json!({"field": "title"}))).unwrap();
        assert_eq!(json["error"]["details"]["field"], "title");
    }

    #[test]
    fn test_tenant_slug_header() {
        assert_eq!(tenant_slug(&headers(&[("x-tenant", " acme ")])), Some("acme".to_string()));
        assert_eq!(tenant_slug(&headers(&[("x-tenant", " ")])), None);
        assert_eq!(tenant_slug(&HeaderMap::new()), None);
    }

    #[test]
    fn test_identity_from_headers() {
        let identity = ReaderIdentity::from_headers(&headers(&[("x-user-id", "7"), ("x-session-id", "abc")]));
        assert_eq!(identity.user_id, Some(7));
        assert_eq!(identity.session_id, "abc");
        assert_eq!(identity.require_user().unwrap(), 7);

        let anonymous = ReaderIdentity::from_headers(&headers(&[("x-user-id", "nope")]));
        assert_eq!(anonymous.user_id, None);
        assert!(anonymous.require_user().is_err());
    }

    #[test]
    fn test_fingerprint_fallback_uses_forwarded_ip() {
        let identity = ReaderIdentity::from_headers(&headers(&[
            ("x-forwarded-for", "10.0.0.1, 10.0.0.2"),
            ("user-agent", "test-agent"),
        ]));
        assert_eq!(identity.session_id, generate_fingerprint("10.0.0.1", "test-agent"));
        assert_eq!(identity.session_id.len(), 32);

        let other = ReaderIdentity::from_headers(&headers(&[("x-real-ip", "10.0.0.9")]));
        assert_eq!(other.session_id, generate_fingerprint("10.0.0.9", ""));
    }
}
