use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{GroceryList, LineItem, ListStatus};
use crate::meal_plans::{GenerationStatus, MealPlan};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    pub item: Uuid,
    pub quantity: i32,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expiry_date: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroceryListRequest {
    pub name: String,
    pub items: Vec<LineItemInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateGroceryListRequest {
    pub name: Option<String>,
    pub status: Option<ListStatus>,
    pub items: Option<Vec<LineItemInput>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroceryListResponse {
    pub id: Uuid,
    pub name: String,
    pub status: ListStatus,
    pub items: Vec<LineItem>,
    pub total_items: i64,
    pub meal_plans: Vec<MealPlan>,
    pub generation: GenerationStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl GroceryListResponse {
    pub fn new(list: GroceryList, generation: GenerationStatus) -> Self {
        Self {
            total_items: list.total_items(),
            id: list.id,
            name: list.name,
            status: list.status,
            items: list.items,
            meal_plans: list.meal_plans,
            generation,
            created_at: list.created_at,
            updated_at: list.updated_at,
        }
    }
}
