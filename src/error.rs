use axum::http::StatusCode;
use thiserror::Error;
use tracing::error;

/// Failures surfaced by the credential and appointment stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already taken")]
    DuplicateUsername,

    #[error("user not found")]
    UserNotFound,

    #[error("date out of range")]
    InvalidDate,

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            StoreError::DuplicateUsername => StatusCode::CONFLICT,
            StoreError::UserNotFound => StatusCode::NOT_FOUND,
            StoreError::InvalidDate => StatusCode::BAD_REQUEST,
            StoreError::PasswordHash(_) | StoreError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Map a store error to the `(status, message)` pair handlers reply with.
/// Internal details are logged and replaced with a generic message.
pub fn reject(e: StoreError) -> (StatusCode, String) {
    let status = e.status();
    if status.is_server_error() {
        error!(error = %e, "store operation failed");
        (status, "Internal server error".into())
    } else {
        (status, e.to_string())
    }
}
