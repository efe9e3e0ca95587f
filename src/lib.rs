pub mod app;
pub mod appointments;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod seed;
pub mod state;

pub use error::StoreError;
pub use state::AppState;
