//! QuillPress - multi-tenant publishing server

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quillpress::{
    api::{self, AppState},
    cache::create_cache,
    config::Config,
    db::{self, repositories::SqlxArticleRepository},
    services::spawn_scheduler,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quillpress=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting QuillPress...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed ({} applied)", applied);

    // Initialize cache
    let cache = create_cache(&config.cache);
    tracing::info!("Cache initialized");

    let state = AppState::new(pool.clone(), cache.clone(), &config);

    // Publish scheduled articles in the background
    let scheduler = spawn_scheduler(
        config.publishing.scheduler_interval_secs,
        SqlxArticleRepository::boxed(pool.clone()),
        cache,
    );
    if scheduler.is_none() {
        tracing::info!("Scheduled publishing disabled");
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    pool.close().await;
    Ok(())
}
