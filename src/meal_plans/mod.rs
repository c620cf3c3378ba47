//! Meal-plan generation: project a list into ingredients, call the AI
//! workflow, normalize whatever comes back and store it on the list.

pub mod error;
pub mod handlers;
pub mod normalizer;
pub mod orchestrator;
pub mod projector;
pub mod types;
pub mod webhook;

use crate::state::AppState;
use axum::Router;

pub use error::{GenerationError, RemoteCallError};
pub use orchestrator::{
    GenerationState, GenerationStatus, MealPlanOrchestrator, TriggerReceipt, MAX_ATTEMPTS,
};
pub use types::{GenerationRequest, Ingredient, MealPlan};
pub use webhook::{HttpWebhookClient, MealPlanWebhook};

pub fn router() -> Router<AppState> {
    handlers::routes()
}
