//! Category service

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use crate::cache::{invalidate_tenant, MemoryCache};
use crate::db::repositories::CategoryRepository;
use crate::models::{Category, CreateCategoryInput};
use crate::services::slug::generate_slug;
use crate::services::{non_blank, ServiceError, ServiceResult};

pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    cache: Arc<MemoryCache>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>, cache: Arc<MemoryCache>) -> Self {
        Self { repo, cache }
    }

    pub async fn create(&self, tenant_id: i64, input: CreateCategoryInput) -> ServiceResult<Category> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::validation("Category name cannot be empty"));
        }
        let slug = generate_slug(input.slug.as_deref().unwrap_or(&name));
        if slug.is_empty() {
            return Err(ServiceError::validation("Category slug cannot be empty"));
        }
        if self
            .repo
            .exists_by_slug(tenant_id, &slug)
            .await
            .context("Failed to check category slug")?
        {
            return Err(ServiceError::conflict(format!("Category slug '{}' already exists", slug)));
        }

        let category = Category {
            id: 0,
            tenant_id,
            slug,
            name,
            description: non_blank(input.description),
            created_at: Utc::now(),
        };
        Ok(self
            .repo
            .create(&category)
            .await
            .context("Failed to create category")?)
    }

    pub async fn get(&self, tenant_id: i64, id: i64) -> ServiceResult<Category> {
        self.repo
            .get_by_id(tenant_id, id)
            .await
            .context("Failed to get category")?
            .ok_or_else(|| ServiceError::not_found("Category"))
    }

    pub async fn list(&self, tenant_id: i64) -> ServiceResult<Vec<Category>> {
        Ok(self.repo.list(tenant_id).await.context("Failed to list categories")?)
    }

    /// Delete a category; its articles become uncategorised
    pub async fn delete(&self, tenant_id: i64, id: i64) -> ServiceResult<()> {
        if !self
            .repo
            .delete(tenant_id, id)
            .await
            .context("Failed to delete category")?
        {
            return Err(ServiceError::not_found("Category"));
        }
        if let Err(e) = invalidate_tenant(self.cache.as_ref(), tenant_id).await {
            tracing::warn!("Failed to invalidate cache for tenant {}: {}", tenant_id, e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxCategoryRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> CategoryService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        CategoryService::new(
            SqlxCategoryRepository::boxed(pool),
            create_cache(&CacheConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_create_list_delete() {
        let service = setup().await;
        let category = service
            .create(
                1,
                CreateCategoryInput {
                    name: "Local SEO".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(category.slug, "local-seo");

        let duplicate = service
            .create(
                1,
                CreateCategoryInput {
                    name: "Other".to_string(),
                    slug: Some("local-seo".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(duplicate, Err(ServiceError::Conflict(_))));

        assert_eq!(service.list(1).await.unwrap().len(), 1);
        service.delete(1, category.id).await.unwrap();
        assert!(matches!(service.get(1, category.id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let service = setup().await;
        let result = service.create(1, CreateCategoryInput::default()).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }
}
