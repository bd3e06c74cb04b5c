//! Tenant service
//!
//! Resolves the tenant of each request by slug. Lookups are cached since
//! every request performs one.

use std::sync::Arc;

use anyhow::Context;

use crate::cache::{CacheLayer, MemoryCache};
use crate::db::repositories::TenantRepository;
use crate::models::{CreateTenantInput, Tenant};
use crate::services::slug::generate_slug;
use crate::services::{ServiceError, ServiceResult};

const CACHE_KEY_TENANT_BY_SLUG: &str = "tenant:slug:";

pub struct TenantService {
    repo: Arc<dyn TenantRepository>,
    cache: Arc<MemoryCache>,
}

impl TenantService {
    pub fn new(repo: Arc<dyn TenantRepository>, cache: Arc<MemoryCache>) -> Self {
        Self { repo, cache }
    }

    /// Resolve a tenant by slug, erroring when it does not exist
    pub async fn resolve(&self, slug: &str) -> ServiceResult<Tenant> {
        let slug = slug.trim().to_lowercase();
        let cache_key = format!("{}{}", CACHE_KEY_TENANT_BY_SLUG, slug);
        if let Ok(Some(tenant)) = self.cache.get::<Tenant>(&cache_key).await {
            return Ok(tenant);
        }

        let tenant = self
            .repo
            .get_by_slug(&slug)
            .await
            .context("Failed to get tenant by slug")?
            .ok_or_else(|| ServiceError::not_found(format!("Tenant '{}'", slug)))?;

        if let Err(e) = self.cache.set(&cache_key, &tenant, self.cache.default_ttl()).await {
            tracing::warn!("Failed to cache tenant {}: {}", slug, e);
        }
        Ok(tenant)
    }

    pub async fn create(&self, input: CreateTenantInput) -> ServiceResult<Tenant> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("Tenant name cannot be empty"));
        }
        let slug = match input.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) => generate_slug(slug),
            None => generate_slug(name),
        };
        if slug.is_empty() {
            return Err(ServiceError::validation("Tenant slug cannot be empty"));
        }

        if self
            .repo
            .get_by_slug(&slug)
            .await
            .context("Failed to check tenant slug")?
            .is_some()
        {
            return Err(ServiceError::conflict(format!("Tenant slug '{}' already exists", slug)));
        }

        let tenant = self
            .repo
            .create(&slug, name)
            .await
            .context("Failed to create tenant")?;
        tracing::info!("Created tenant {} ({})", tenant.slug, tenant.id);
        Ok(tenant)
    }

    pub async fn list(&self) -> ServiceResult<Vec<Tenant>> {
        Ok(self.repo.list().await.context("Failed to list tenants")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxTenantRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> TenantService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        TenantService::new(
            SqlxTenantRepository::boxed(pool),
            create_cache(&CacheConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_resolve_default_tenant() {
        let service = setup().await;
        let tenant = service.resolve("default").await.unwrap();
        assert_eq!(tenant.slug, "default");

        // Second lookup is served from the cache
        let again = service.resolve(" Default ").await.unwrap();
        assert_eq!(again.id, tenant.id);
    }

    #[tokio::test]
    async fn test_resolve_unknown_tenant() {
        let service = setup().await;
        let err = service.resolve("nope").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let service = setup().await;
        let tenant = service
            .create(CreateTenantInput {
                name: "Acme Media".to_string(),
                slug: None,
            })
            .await
            .unwrap();
        assert_eq!(tenant.slug, "acme-media");
        assert_eq!(service.resolve("acme-media").await.unwrap().id, tenant.id);

        let duplicate = service
            .create(CreateTenantInput {
                name: "Other".to_string(),
                slug: Some("Acme Media".to_string()),
            })
            .await;
        assert!(matches!(duplicate, Err(ServiceError::Conflict(_))));

        let blank = service
            .create(CreateTenantInput {
                name: "  ".to_string(),
                slug: None,
            })
            .await;
        assert!(matches!(blank, Err(ServiceError::Validation(_))));

        assert_eq!(service.list().await.unwrap().len(), 2);
    }
}
