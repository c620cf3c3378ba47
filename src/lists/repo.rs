use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::repo_types::{GroceryList, GroceryListRow, ListPatch, NewGroceryList};
use crate::meal_plans::MealPlan;

/// Owner-scoped access to grocery lists. Every write touches only the columns
/// it names, so list edits and meal-plan persistence never clobber each other.
#[async_trait]
pub trait GroceryListRepo: Send + Sync {
    async fn create(&self, user_id: Uuid, list: NewGroceryList) -> anyhow::Result<GroceryList>;
    async fn get(&self, user_id: Uuid, list_id: Uuid) -> anyhow::Result<Option<GroceryList>>;
    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<GroceryList>>;
    async fn update(
        &self,
        user_id: Uuid,
        list_id: Uuid,
        patch: ListPatch,
    ) -> anyhow::Result<Option<GroceryList>>;
    async fn delete(&self, user_id: Uuid, list_id: Uuid) -> anyhow::Result<bool>;
    /// Replaces `mealPlans` wholesale. Returns `false` when the list no longer
    /// exists for this owner, in which case nothing was written.
    async fn set_meal_plans(
        &self,
        user_id: Uuid,
        list_id: Uuid,
        plans: &[MealPlan],
    ) -> anyhow::Result<bool>;
}

const LIST_COLUMNS: &str = "id, user_id, name, status, items, meal_plans, created_at, updated_at";

#[derive(Clone)]
pub struct PgGroceryListRepo {
    db: PgPool,
}

impl PgGroceryListRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl GroceryListRepo for PgGroceryListRepo {
    async fn create(&self, user_id: Uuid, list: NewGroceryList) -> anyhow::Result<GroceryList> {
        let row = sqlx::query_as::<_, GroceryListRow>(&format!(
            r#"
            INSERT INTO grocery_lists (id, user_id, name, items)
            VALUES ($1, $2, $3, $4)
            RETURNING {LIST_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&list.name)
        .bind(Json(&list.items))
        .fetch_one(&self.db)
        .await
        .context("insert grocery list")?;
        row.try_into()
    }

    async fn get(&self, user_id: Uuid, list_id: Uuid) -> anyhow::Result<Option<GroceryList>> {
        let row = sqlx::query_as::<_, GroceryListRow>(&format!(
            r#"
            SELECT {LIST_COLUMNS}
              FROM grocery_lists
             WHERE id = $1 AND user_id = $2
            "#
        ))
        .bind(list_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("get grocery list")?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<GroceryList>> {
        let rows = sqlx::query_as::<_, GroceryListRow>(&format!(
            r#"
            SELECT {LIST_COLUMNS}
              FROM grocery_lists
             WHERE user_id = $1
             ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list grocery lists")?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update(
        &self,
        user_id: Uuid,
        list_id: Uuid,
        patch: ListPatch,
    ) -> anyhow::Result<Option<GroceryList>> {
        let row = sqlx::query_as::<_, GroceryListRow>(&format!(
            r#"
            UPDATE grocery_lists
               SET name = COALESCE($3, name),
                   status = COALESCE($4, status),
                   items = COALESCE($5, items),
                   updated_at = now()
             WHERE id = $1 AND user_id = $2
            RETURNING {LIST_COLUMNS}
            "#
        ))
        .bind(list_id)
        .bind(user_id)
        .bind(patch.name)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.items.map(Json))
        .fetch_optional(&self.db)
        .await
        .context("update grocery list")?;
        row.map(TryInto::try_into).transpose()
    }

    async fn delete(&self, user_id: Uuid, list_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM grocery_lists WHERE id = $1 AND user_id = $2")
            .bind(list_id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete grocery list")?;
        Ok(res.rows_affected() == 1)
    }

    async fn set_meal_plans(
        &self,
        user_id: Uuid,
        list_id: Uuid,
        plans: &[MealPlan],
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE grocery_lists
               SET meal_plans = $3,
                   updated_at = now()
             WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(list_id)
        .bind(user_id)
        .bind(Json(plans))
        .execute(&self.db)
        .await
        .context("persist meal plans")?;
        Ok(res.rows_affected() == 1)
    }
}
