use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        extractors::AuthUser,
        jwt::JwtKeys,
        repo_types::{Role, User},
        services::{is_valid_username, issue_tokens, MIN_PASSWORD_LEN},
    },
    error::reject,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), (StatusCode, String)> {
    payload.username = payload.username.trim().to_string();
    payload.name = payload.name.trim().to_string();

    if !is_valid_username(&payload.username) {
        warn!(username = %payload.username, "invalid username");
        return Err((StatusCode::BAD_REQUEST, "Invalid username".into()));
    }

    if payload.name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Name is required".into()));
    }

    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    let user = User::register(
        &state.db,
        &payload.username,
        &payload.name,
        &payload.password,
        Role::User,
    )
    .await
    .map_err(|e| {
        warn!(username = %payload.username, error = %e, "registration rejected");
        reject(e)
    })?;

    let keys = JwtKeys::from_ref(&state);
    let response = issue_tokens(&keys, user).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
    })?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let username = payload.username.trim();

    let user = match User::verify(&state.db, username, &payload.password).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(username = %username, "login rejected");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => return Err(reject(e)),
    };

    let keys = JwtKeys::from_ref(&state);
    let response = issue_tokens(&keys, user).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
    })?;

    info!(user_id = response.user.id, username = %response.user.username, "user logged in");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| {
            warn!(error = %e, "refresh token rejected");
            (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_string())
        })?;

    // Reload so the new pair reflects the stored role.
    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .map_err(reject)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    let response = issue_tokens(&keys, user).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
    })?;
    Ok(Json(response))
}

#[instrument(skip(state, auth), fields(user_id = auth.id))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = User::find_by_id(&state.db, auth.id)
        .await
        .map_err(reject)?
        .ok_or_else(|| {
            error!(user_id = auth.id, "user not found");
            (StatusCode::UNAUTHORIZED, "User not found".to_string())
        })?;

    Ok(Json(user.into()))
}
