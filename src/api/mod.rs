//! API layer - HTTP handlers and routing
//!
//! Reader endpoints live under `/api/v1`, admin endpoints under
//! `/api/v1/admin`. The editor's publish action is served at
//! `/api/articles/publish`. Every endpoint works on the tenant named by the
//! `X-Tenant` header.

pub mod admin;
pub mod articles;
pub mod categories;
pub mod clients;
pub mod common;
pub mod engagement;
pub mod faqs;
pub mod middleware;
pub mod subscribers;
pub mod users;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::post,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use middleware::{ApiError, AppState, ReaderIdentity, TenantContext};

/// Build the `/api/v1` router
pub fn build_api_router() -> Router<AppState> {
    let admin_routes = Router::new()
        .merge(admin::router())
        .merge(clients::router())
        .nest("/articles", articles::admin_router())
        .nest("/categories", categories::admin_router())
        .nest("/faqs", faqs::admin_router())
        .nest("/comments", engagement::admin_router())
        .nest("/users", users::admin_router())
        .nest("/subscribers", subscribers::admin_router());

    Router::new()
        .nest("/articles", articles::public_router())
        .nest("/categories", categories::public_router())
        .nest("/faqs", faqs::public_router())
        .merge(engagement::public_router())
        .merge(users::public_router())
        .merge(subscribers::public_router())
        .nest("/admin", admin_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    Router::new()
        .nest("/api/v1", build_api_router())
        .route("/api/articles/publish", post(articles::publish_article))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors_layer(cors_origin)),
        )
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(middleware::TENANT_HEADER),
            HeaderName::from_static(middleware::USER_ID_HEADER),
            HeaderName::from_static(middleware::SESSION_ID_HEADER),
        ]);

    if origin == "*" {
        return cors.allow_origin(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => cors.allow_origin(value),
        Err(e) => {
            tracing::warn!("Invalid CORS origin '{}': {}, allowing any origin", origin, e);
            cors.allow_origin(Any)
        }
    }
}
