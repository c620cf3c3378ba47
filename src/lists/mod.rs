pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
mod services;

use crate::state::AppState;
use axum::Router;

pub use repo::{GroceryListRepo, PgGroceryListRepo};
pub use repo_types::{GroceryList, LineItem, ListPatch, ListStatus, NewGroceryList};

pub fn router() -> Router<AppState> {
    handlers::routes()
}
