pub mod catalog;
pub mod dto;
pub mod export;
pub mod handlers;
pub mod repo;
pub mod repo_types;

pub use repo_types::{Appointment, AppointmentWithOwner};

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::user_routes())
        .merge(handlers::admin_routes())
}
