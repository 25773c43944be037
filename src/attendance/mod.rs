pub mod date;
mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::staff_routes())
        .merge(handlers::self_service_routes())
        .merge(handlers::device_routes())
}
