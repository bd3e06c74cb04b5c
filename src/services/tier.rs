//! Subscription tier service

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use crate::cache::{invalidate_tenant, MemoryCache};
use crate::db::repositories::TierRepository;
use crate::models::{CreateTierInput, SubscriptionTier, UpdateTierInput};
use crate::services::slug::generate_slug;
use crate::services::{non_blank, ServiceError, ServiceResult};

pub struct TierService {
    repo: Arc<dyn TierRepository>,
    cache: Arc<MemoryCache>,
}

impl TierService {
    pub fn new(repo: Arc<dyn TierRepository>, cache: Arc<MemoryCache>) -> Self {
        Self { repo, cache }
    }

    pub async fn create(&self, tenant_id: i64, input: CreateTierInput) -> ServiceResult<SubscriptionTier> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::validation("Tier name cannot be empty"));
        }
        validate_amounts(input.monthly_article_quota, input.price_cents)?;

        let slug = generate_slug(input.slug.as_deref().unwrap_or(&name));
        if slug.is_empty() {
            return Err(ServiceError::validation("Tier slug cannot be empty"));
        }
        if self
            .repo
            .exists_by_slug(tenant_id, &slug)
            .await
            .context("Failed to check tier slug")?
        {
            return Err(ServiceError::conflict(format!("Tier slug '{}' already exists", slug)));
        }

        let now = Utc::now();
        let tier = SubscriptionTier {
            id: 0,
            tenant_id,
            slug,
            name,
            monthly_article_quota: input.monthly_article_quota,
            price_cents: input.price_cents,
            description: non_blank(input.description),
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        let tier = self.repo.create(&tier).await.context("Failed to create tier")?;
        self.invalidate(tenant_id).await;
        Ok(tier)
    }

    pub async fn get(&self, tenant_id: i64, id: i64) -> ServiceResult<SubscriptionTier> {
        self.repo
            .get_by_id(tenant_id, id)
            .await
            .context("Failed to get tier")?
            .ok_or_else(|| ServiceError::not_found("Tier"))
    }

    pub async fn list(&self, tenant_id: i64, active_only: bool) -> ServiceResult<Vec<SubscriptionTier>> {
        Ok(self
            .repo
            .list(tenant_id, active_only)
            .await
            .context("Failed to list tiers")?)
    }

    pub async fn update(
        &self,
        tenant_id: i64,
        id: i64,
        input: UpdateTierInput,
    ) -> ServiceResult<SubscriptionTier> {
        let mut tier = self.get(tenant_id, id).await?;

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ServiceError::validation("Tier name cannot be empty"));
            }
            tier.name = name;
        }
        if let Some(quota) = input.monthly_article_quota {
            tier.monthly_article_quota = quota;
        }
        if let Some(price) = input.price_cents {
            tier.price_cents = price;
        }
        if input.description.is_some() {
            tier.description = non_blank(input.description);
        }
        if let Some(active) = input.is_active {
            tier.is_active = active;
        }
        validate_amounts(tier.monthly_article_quota, tier.price_cents)?;

        let tier = self.repo.update(&tier).await.context("Failed to update tier")?;
        self.invalidate(tenant_id).await;
        Ok(tier)
    }

    /// Delete a tier. Clients on it keep existing without a tier.
    pub async fn delete(&self, tenant_id: i64, id: i64) -> ServiceResult<()> {
        let deleted = self
            .repo
            .delete(tenant_id, id)
            .await
            .context("Failed to delete tier")?;
        if !deleted {
            return Err(ServiceError::not_found("Tier"));
        }
        self.invalidate(tenant_id).await;
        Ok(())
    }

    async fn invalidate(&self, tenant_id: i64) {
        if let Err(e) = invalidate_tenant(self.cache.as_ref(), tenant_id).await {
            tracing::warn!("Failed to invalidate cache for tenant {}: {}", tenant_id, e);
        }
    }
}

fn validate_amounts(quota: Option<i64>, price_cents: i64) -> ServiceResult<()> {
    if quota.is_some_and(|q| q < 0) {
        return Err(ServiceError::validation("Monthly article quota cannot be negative"));
    }
    if price_cents < 0 {
        return Err(ServiceError::validation("Price cannot be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxTierRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> TierService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        TierService::new(SqlxTierRepository::boxed(pool), create_cache(&CacheConfig::default()))
    }

    #[tokio::test]
    async fn test_create_tier() {
        let service = setup().await;
        let tier = service
            .create(
                1,
                CreateTierInput {
                    name: "Agency Plus".to_string(),
                    monthly_article_quota: Some(30),
                    price_cents: 99_900,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(tier.slug, "agency-plus");
        assert!(tier.is_active);
        assert_eq!(service.list(1, false).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_and_invalid() {
        let service = setup().await;
        let duplicate = service
            .create(1, CreateTierInput { name: "Starter".to_string(), ..Default::default() })
            .await;
        assert!(matches!(duplicate, Err(ServiceError::Conflict(_))));

        let negative = service
            .create(
                1,
                CreateTierInput {
                    name: "Broken".to_string(),
                    monthly_article_quota: Some(-1),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(negative, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_switches_to_unlimited_and_deactivates() {
        let service = setup().await;
        let updated = service
            .update(
                1,
                1,
                UpdateTierInput {
                    monthly_article_quota: Some(None),
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.is_unlimited());
        assert!(!updated.is_active);
        assert_eq!(service.list(1, true).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_and_missing() {
        let service = setup().await;
        service.delete(1, 1).await.unwrap();
        assert!(matches!(service.get(1, 1).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(service.delete(1, 1).await, Err(ServiceError::NotFound(_))));
    }
}
