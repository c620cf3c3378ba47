use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    error::GenerationError,
    orchestrator::{GenerationStatus, TriggerReceipt},
};
use crate::{app::internal, auth::AuthUser, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/grocery-lists/:id/generate-meal-plan",
            post(generate_meal_plans),
        )
        .route("/grocery-lists/:id/generation", get(generation_status))
}

/// Schedules a manual attempt and answers 202 without waiting for the
/// workflow. Rejections are synchronous.
#[instrument(skip(state))]
pub async fn generate_meal_plans(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<TriggerReceipt>), (StatusCode, String)> {
    match state.meal_plans.request(user_id, id).await {
        Ok(receipt) => {
            info!(%user_id, list_id = %id, attempt = receipt.attempt, "manual meal plan generation accepted");
            Ok((StatusCode::ACCEPTED, Json(receipt)))
        }
        Err(e) => Err(rejection(user_id, id, e)),
    }
}

#[instrument(skip(state))]
pub async fn generation_status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<GenerationStatus>, (StatusCode, String)> {
    let list = state
        .lists
        .get(user_id, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Grocery list not found".to_string()))?;
    Ok(Json(state.meal_plans.status(&list)))
}

fn rejection(user_id: Uuid, list_id: Uuid, e: GenerationError) -> (StatusCode, String) {
    let status = e.status_code();
    if status.is_server_error() {
        error!(error = %e, kind = e.kind(), %user_id, %list_id, "manual meal plan generation failed");
    } else {
        warn!(kind = e.kind(), %user_id, %list_id, "manual meal plan generation rejected");
    }
    (status, e.public_message().to_string())
}
