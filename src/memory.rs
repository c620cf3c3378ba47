//! Process-local store for development runs (`STORE_BACKEND=memory`) and tests.
//! Each write takes the lock once and touches only its own fields, which gives
//! the same field-level discipline as the SQL updates.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    catalog::{CatalogItem, CatalogRepo, NewCatalogItem},
    lists::{GroceryList, GroceryListRepo, ListPatch, ListStatus, NewGroceryList},
    meal_plans::MealPlan,
};

#[derive(Default)]
pub struct MemoryStore {
    lists: RwLock<HashMap<Uuid, GroceryList>>,
    catalog: RwLock<HashMap<Uuid, CatalogItem>>,
}

#[async_trait]
impl GroceryListRepo for MemoryStore {
    async fn create(&self, user_id: Uuid, list: NewGroceryList) -> anyhow::Result<GroceryList> {
        let now = OffsetDateTime::now_utc();
        let list = GroceryList {
            id: Uuid::new_v4(),
            user_id,
            name: list.name,
            status: ListStatus::Active,
            items: list.items,
            meal_plans: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.lists
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(list.id, list.clone());
        Ok(list)
    }

    async fn get(&self, user_id: Uuid, list_id: Uuid) -> anyhow::Result<Option<GroceryList>> {
        let lists = self.lists.read().unwrap_or_else(PoisonError::into_inner);
        Ok(lists
            .get(&list_id)
            .filter(|l| l.user_id == user_id)
            .cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<GroceryList>> {
        let lists = self.lists.read().unwrap_or_else(PoisonError::into_inner);
        let mut owned: Vec<_> = lists
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn update(
        &self,
        user_id: Uuid,
        list_id: Uuid,
        patch: ListPatch,
    ) -> anyhow::Result<Option<GroceryList>> {
        let mut lists = self.lists.write().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = lists.get_mut(&list_id).filter(|l| l.user_id == user_id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            list.name = name;
        }
        if let Some(status) = patch.status {
            list.status = status;
        }
        if let Some(items) = patch.items {
            list.items = items;
        }
        list.updated_at = OffsetDateTime::now_utc();
        Ok(Some(list.clone()))
    }

    async fn delete(&self, user_id: Uuid, list_id: Uuid) -> anyhow::Result<bool> {
        let mut lists = self.lists.write().unwrap_or_else(PoisonError::into_inner);
        if lists.get(&list_id).is_some_and(|l| l.user_id == user_id) {
            lists.remove(&list_id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn set_meal_plans(
        &self,
        user_id: Uuid,
        list_id: Uuid,
        plans: &[MealPlan],
    ) -> anyhow::Result<bool> {
        let mut lists = self.lists.write().unwrap_or_else(PoisonError::into_inner);
        match lists.get_mut(&list_id).filter(|l| l.user_id == user_id) {
            Some(list) => {
                list.meal_plans = plans.to_vec();
                list.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl CatalogRepo for MemoryStore {
    async fn create(&self, item: NewCatalogItem) -> anyhow::Result<CatalogItem> {
        let item = CatalogItem {
            id: Uuid::new_v4(),
            name: item.name,
            price: item.price,
            nutrition: item.nutrition,
            disabled: false,
            created_at: OffsetDateTime::now_utc(),
        };
        self.catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(item.id, item.clone());
        Ok(item)
    }

    async fn list(&self) -> anyhow::Result<Vec<CatalogItem>> {
        let catalog = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        let mut items: Vec<_> = catalog.values().filter(|c| !c.disabled).cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<CatalogItem>> {
        let catalog = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        Ok(ids.iter().filter_map(|id| catalog.get(id).cloned()).collect())
    }
}
