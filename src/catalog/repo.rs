use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::repo_types::{CatalogItem, CatalogItemRow, NewCatalogItem};

#[async_trait]
pub trait CatalogRepo: Send + Sync {
    async fn create(&self, item: NewCatalogItem) -> anyhow::Result<CatalogItem>;
    /// Enabled items, newest first.
    async fn list(&self) -> anyhow::Result<Vec<CatalogItem>>;
    /// Resolves the given ids; unknown ids are simply absent from the result.
    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<CatalogItem>>;
}

#[derive(Clone)]
pub struct PgCatalogRepo {
    db: PgPool,
}

impl PgCatalogRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogRepo for PgCatalogRepo {
    async fn create(&self, item: NewCatalogItem) -> anyhow::Result<CatalogItem> {
        let row = sqlx::query_as::<_, CatalogItemRow>(
            r#"
            INSERT INTO catalog_items (id, name, price, nutrition)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, price, nutrition, disabled, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&item.name)
        .bind(item.price)
        .bind(Json(&item.nutrition))
        .fetch_one(&self.db)
        .await
        .context("insert catalog item")?;
        Ok(row.into())
    }

    async fn list(&self) -> anyhow::Result<Vec<CatalogItem>> {
        let rows = sqlx::query_as::<_, CatalogItemRow>(
            r#"
            SELECT id, name, price, nutrition, disabled, created_at
              FROM catalog_items
             WHERE NOT disabled
             ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list catalog items")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<CatalogItem>> {
        let rows = sqlx::query_as::<_, CatalogItemRow>(
            r#"
            SELECT id, name, price, nutrition, disabled, created_at
              FROM catalog_items
             WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await
        .context("resolve catalog items")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
