use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::meal_plans::MealPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStatus {
    #[default]
    Active,
    Completed,
}

impl ListStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ListStatus::Active => "active",
            ListStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ListStatus::Active),
            "completed" => Some(ListStatus::Completed),
            _ => None,
        }
    }
}

/// One entry of a grocery list, pointing at a catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub item: Uuid,
    pub quantity: i32,
    #[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub added_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroceryList {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub status: ListStatus,
    pub items: Vec<LineItem>,
    pub meal_plans: Vec<MealPlan>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl GroceryList {
    pub fn total_items(&self) -> i64 {
        self.items.iter().map(|i| i64::from(i.quantity)).sum()
    }
}

#[derive(Debug, Clone)]
pub struct NewGroceryList {
    pub name: String,
    pub items: Vec<LineItem>,
}

/// Field-level edit. `None` leaves the column untouched; meal plans are
/// deliberately not representable here.
#[derive(Debug, Clone, Default)]
pub struct ListPatch {
    pub name: Option<String>,
    pub status: Option<ListStatus>,
    pub items: Option<Vec<LineItem>>,
}

#[derive(Debug, FromRow)]
pub struct GroceryListRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub status: String,
    pub items: Json<Vec<LineItem>>,
    pub meal_plans: Json<Vec<MealPlan>>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<GroceryListRow> for GroceryList {
    type Error = anyhow::Error;

    fn try_from(r: GroceryListRow) -> Result<Self, Self::Error> {
        let status = ListStatus::parse(&r.status)
            .with_context(|| format!("unknown list status {:?} on {}", r.status, r.id))?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            name: r.name,
            status,
            items: r.items.0,
            meal_plans: r.meal_plans.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}
