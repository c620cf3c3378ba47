use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateGroceryListRequest, GroceryListResponse, UpdateGroceryListRequest},
    repo_types::GroceryList,
    services::{validate_new_list, validate_patch},
};
use crate::{app::internal, auth::AuthUser, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/grocery-lists", get(list_grocery_lists).post(create_grocery_list))
        .route(
            "/grocery-lists/:id",
            get(get_grocery_list)
                .patch(update_grocery_list)
                .delete(delete_grocery_list),
        )
}

fn respond(state: &AppState, list: GroceryList) -> GroceryListResponse {
    let generation = state.meal_plans.status(&list);
    GroceryListResponse::new(list, generation)
}

#[instrument(skip(state))]
pub async fn list_grocery_lists(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<GroceryListResponse>>, (StatusCode, String)> {
    let lists = state.lists.list_by_user(user_id).await.map_err(internal)?;
    Ok(Json(lists.into_iter().map(|l| respond(&state, l)).collect()))
}

#[instrument(skip(state))]
pub async fn get_grocery_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<GroceryListResponse>, (StatusCode, String)> {
    let list = state
        .lists
        .get(user_id, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Grocery list not found".to_string()))?;
    Ok(Json(respond(&state, list)))
}

/// Stores the list and returns it straight away with empty `mealPlans`;
/// generation is scheduled in the background.
#[instrument(skip(state, body))]
pub async fn create_grocery_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateGroceryListRequest>,
) -> Result<(StatusCode, HeaderMap, Json<GroceryListResponse>), (StatusCode, String)> {
    let new_list = validate_new_list(body, OffsetDateTime::now_utc()).map_err(|msg| {
        warn!(%user_id, msg, "invalid grocery list");
        (StatusCode::BAD_REQUEST, msg.to_string())
    })?;

    let list = state.lists.create(user_id, new_list).await.map_err(internal)?;
    info!(%user_id, list_id = %list.id, items = list.items.len(), "grocery list created");

    state.meal_plans.schedule_after_create(&list);

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/grocery-lists/{}", list.id)) {
        headers.insert(header::LOCATION, location);
    }

    Ok((StatusCode::CREATED, headers, Json(respond(&state, list))))
}

#[instrument(skip(state, body))]
pub async fn update_grocery_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateGroceryListRequest>,
) -> Result<Json<GroceryListResponse>, (StatusCode, String)> {
    let patch = validate_patch(body, OffsetDateTime::now_utc())
        .map_err(|msg| (StatusCode::BAD_REQUEST, msg.to_string()))?;
    let list = state
        .lists
        .update(user_id, id, patch)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Grocery list not found".to_string()))?;
    info!(%user_id, list_id = %id, "grocery list updated");
    Ok(Json(respond(&state, list)))
}

#[instrument(skip(state))]
pub async fn delete_grocery_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if !state.lists.delete(user_id, id).await.map_err(internal)? {
        return Err((StatusCode::NOT_FOUND, "Grocery list not found".into()));
    }
    state.meal_plans.forget(id);
    info!(%user_id, list_id = %id, "grocery list deleted");
    Ok(StatusCode::NO_CONTENT)
}
