use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::catalog::Nutrition;

/// One AI-suggested meal, fully defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    pub name: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: String,
    pub prep_time: String,
    pub cook_time: String,
    pub difficulty: String,
    pub servings: u32,
    pub nutrition_highlights: Vec<String>,
    pub cooking_method: String,
}

/// Catalog snapshot of one line item, sent to the workflow service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: i32,
    pub nutrition: Nutrition,
}

/// Exact body POSTed to the workflow webhook.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub grocery_list_id: Uuid,
    pub ingredients: Vec<Ingredient>,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub requested_at: OffsetDateTime,
}
