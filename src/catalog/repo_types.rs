use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

/// Nutrition facts per catalog item; every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub nutrition: Nutrition,
    pub disabled: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewCatalogItem {
    pub name: String,
    pub price: f64,
    pub nutrition: Nutrition,
}

#[derive(Debug, FromRow)]
pub struct CatalogItemRow {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub nutrition: Json<Nutrition>,
    pub disabled: bool,
    pub created_at: OffsetDateTime,
}

impl From<CatalogItemRow> for CatalogItem {
    fn from(r: CatalogItemRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            price: r.price,
            nutrition: r.nutrition.0,
            disabled: r.disabled,
            created_at: r.created_at,
        }
    }
}
