use std::sync::Arc;

use anyhow::Context;

use crate::catalog::{CatalogRepo, PgCatalogRepo};
use crate::config::{AppConfig, StoreBackend};
use crate::lists::{GroceryListRepo, PgGroceryListRepo};
use crate::meal_plans::{HttpWebhookClient, MealPlanOrchestrator, MealPlanWebhook};
use crate::memory::MemoryStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub lists: Arc<dyn GroceryListRepo>,
    pub catalog: Arc<dyn CatalogRepo>,
    pub meal_plans: Arc<MealPlanOrchestrator>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let (lists, catalog): (Arc<dyn GroceryListRepo>, Arc<dyn CatalogRepo>) = match config.store
        {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is not set")?;
                let db = crate::db::connect(url).await?;
                (
                    Arc::new(PgGroceryListRepo::new(db.clone())) as Arc<dyn GroceryListRepo>,
                    Arc::new(PgCatalogRepo::new(db)) as Arc<dyn CatalogRepo>,
                )
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; data is lost on restart");
                let store = Arc::new(MemoryStore::default());
                (
                    store.clone() as Arc<dyn GroceryListRepo>,
                    store as Arc<dyn CatalogRepo>,
                )
            }
        };

        if let Err(missing) = config.webhook.endpoint() {
            tracing::warn!(missing, "meal plan webhook not configured; generation attempts will fail");
        }
        let webhook = Arc::new(HttpWebhookClient::new(config.webhook.clone())?);

        Ok(Self::from_parts(Arc::new(config), lists, catalog, webhook))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        lists: Arc<dyn GroceryListRepo>,
        catalog: Arc<dyn CatalogRepo>,
        webhook: Arc<dyn MealPlanWebhook>,
    ) -> Self {
        let meal_plans = MealPlanOrchestrator::new(lists.clone(), catalog.clone(), webhook);
        Self {
            config,
            lists,
            catalog,
            meal_plans,
        }
    }
}
