use axum::{
    extract::{Path, State},
    http::{header, HeaderName, StatusCode},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use time::{OffsetDateTime, UtcOffset};
use tracing::{error, info, instrument, warn};

use crate::{
    appointments::{
        catalog,
        dto::{AppointmentRequest, BookedResponse, CatalogEntry},
        export::{to_csv, EXPORT_FILE_NAME},
        repo_types::{Appointment, AppointmentWithOwner},
    },
    auth::{AdminUser, AuthUser},
    error::reject,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/appointments/catalog", get(get_catalog))
        .route("/appointments", get(list_mine).post(book))
        .route("/appointments/:id", put(edit).delete(cancel))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/appointments", get(list_all))
        .route("/admin/appointments/export", get(export_csv))
}

pub async fn get_catalog() -> Json<Vec<CatalogEntry>> {
    let entries = catalog::CATALOG
        .iter()
        .map(|&(category, sub_types)| CatalogEntry {
            category,
            sub_types,
        })
        .collect();
    Json(entries)
}

#[instrument(skip(state, auth), fields(user_id = auth.id))]
pub async fn list_mine(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Appointment>>, (StatusCode, String)> {
    let rows = Appointment::list_for_user(&state.db, &auth.username)
        .await
        .map_err(reject)?;
    Ok(Json(rows))
}

#[instrument(skip(state, auth, body), fields(user_id = auth.id))]
pub async fn book(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<AppointmentRequest>,
) -> Result<
    (StatusCode, [(HeaderName, String); 1], Json<BookedResponse>),
    (StatusCode, String),
> {
    validate(&body, OffsetDateTime::now_utc())?;

    let id = Appointment::create(
        &state.db,
        &auth.username,
        &body.appointment_type,
        &body.sub_type,
        body.date,
    )
    .await
    .map_err(reject)?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/v1/appointments/{}", id))],
        Json(BookedResponse { id }),
    ))
}

#[instrument(skip(state, auth, body), fields(user_id = auth.id))]
pub async fn edit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<AppointmentRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    validate(&body, OffsetDateTime::now_utc())?;
    ensure_visible(&state, &auth, id).await?;

    let found = Appointment::update(
        &state.db,
        id,
        &body.appointment_type,
        &body.sub_type,
        body.date,
    )
    .await
    .map_err(reject)?;

    if !found {
        return Err(not_found());
    }
    info!(appointment_id = id, "appointment updated");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, auth), fields(user_id = auth.id))]
pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    ensure_visible(&state, &auth, id).await?;

    if !Appointment::delete(&state.db, id).await.map_err(reject)? {
        return Err(not_found());
    }
    info!(appointment_id = id, "appointment cancelled");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, admin), fields(admin_id = admin.0.id))]
pub async fn list_all(
    State(state): State<AppState>,
    admin: AdminUser,
) -> Result<Json<Vec<AppointmentWithOwner>>, (StatusCode, String)> {
    let rows = Appointment::list_all(&state.db).await.map_err(reject)?;
    Ok(Json(rows))
}

#[instrument(skip(state, admin), fields(admin_id = admin.0.id))]
pub async fn export_csv(
    State(state): State<AppState>,
    admin: AdminUser,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let rows = Appointment::list_all(&state.db).await.map_err(reject)?;
    let csv = to_csv(&rows).map_err(|e| {
        error!(error = %e, "csv export failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    })?;

    info!(rows = rows.len(), "appointments exported");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
        ],
        csv,
    ))
}

/// Reject bodies whose service is not offered under the chosen category.
/// Dates must be representable in UTC and must not be earlier than `now`.
fn validate(body: &AppointmentRequest, now: OffsetDateTime) -> Result<(), (StatusCode, String)> {
    if !catalog::is_valid(&body.appointment_type, &body.sub_type) {
        warn!(
            appointment_type = %body.appointment_type,
            sub_type = %body.sub_type,
            "unknown service"
        );
        return Err((StatusCode::BAD_REQUEST, "Unknown appointment type or service".into()));
    }
    let in_range = body
        .date
        .checked_to_offset(UtcOffset::UTC)
        .is_some_and(|utc| (1..=9999).contains(&utc.year()));
    if !in_range {
        return Err((StatusCode::BAD_REQUEST, "Date out of range".into()));
    }
    if body.date < now {
        return Err((StatusCode::BAD_REQUEST, "Date must not be in the past".into()));
    }
    Ok(())
}

/// Owners see their own appointments; admins see everyone's. Anything else
/// looks exactly like a missing id.
async fn ensure_visible(
    state: &AppState,
    auth: &AuthUser,
    id: i64,
) -> Result<(), (StatusCode, String)> {
    match Appointment::find_by_id(&state.db, id).await.map_err(reject)? {
        Some(appt) if appt.user_id == auth.id || auth.is_admin() => Ok(()),
        Some(_) => {
            warn!(appointment_id = id, user_id = auth.id, "foreign appointment access");
            Err(not_found())
        }
        None => Err(not_found()),
    }
}

fn not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Appointment not found".into())
}
