pub mod app;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod lists;
pub mod meal_plans;
pub mod memory;
pub mod poller;
pub mod state;
