use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod manager;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod serializers;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
