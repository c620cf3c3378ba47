use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{auth::AuthUser, state::AppState};

use super::{dto::CreateCatalogItemRequest, repo_types::CatalogItem};

pub fn routes() -> Router<AppState> {
    Router::new().route("/items", get(list_items).post(create_item))
}

#[instrument(skip(state))]
pub async fn list_items(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> Result<Json<Vec<CatalogItem>>, (StatusCode, String)> {
    let items = state.catalog.list().await.map_err(crate::app::internal)?;
    Ok(Json(items))
}

#[instrument(skip(state, body))]
pub async fn create_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateCatalogItemRequest>,
) -> Result<(StatusCode, Json<CatalogItem>), (StatusCode, String)> {
    let new_item = body.validate().map_err(|msg| {
        warn!(%user_id, msg, "invalid catalog item");
        (StatusCode::BAD_REQUEST, msg.to_string())
    })?;
    let item = state
        .catalog
        .create(new_item)
        .await
        .map_err(crate::app::internal)?;
    info!(item_id = %item.id, name = %item.name, "catalog item created");
    Ok((StatusCode::CREATED, Json(item)))
}
