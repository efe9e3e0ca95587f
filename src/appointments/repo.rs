use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::appointments::repo_types::{
    normalize_utc, Appointment, AppointmentWithOwner, STATUS_CONFIRMED,
};
use crate::auth::User;
use crate::error::StoreError;

impl Appointment {
    /// Book an appointment for `username`. The category/service pair is not
    /// checked here; callers validate it against the catalog.
    ///
    /// Fails with [`StoreError::InvalidDate`] when `date` falls outside years
    /// 1..=9999 once shifted to UTC.
    pub async fn create(
        db: &SqlitePool,
        username: &str,
        appointment_type: &str,
        sub_type: &str,
        date: OffsetDateTime,
    ) -> Result<i64, StoreError> {
        let date = normalize_utc(date)?;
        let user = User::find_by_username(db, username)
            .await?
            .ok_or(StoreError::UserNotFound)?;

        let id = sqlx::query(
            r#"
            INSERT INTO appointments
                (user_id, appointment_type, sub_type, date, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id)
        .bind(appointment_type)
        .bind(sub_type)
        .bind(date)
        .bind(STATUS_CONFIRMED)
        .bind(normalize_utc(OffsetDateTime::now_utc())?)
        .execute(db)
        .await?
        .last_insert_rowid();

        info!(appointment_id = id, user_id = user.id, sub_type, "appointment booked");
        Ok(id)
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<Appointment>, StoreError> {
        let row = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, user_id, appointment_type, sub_type, date, status, created_at
            FROM appointments
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// All appointments of one user, earliest first.
    pub async fn list_for_user(
        db: &SqlitePool,
        username: &str,
    ) -> Result<Vec<Appointment>, StoreError> {
        let rows = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT a.id, a.user_id, a.appointment_type, a.sub_type, a.date, a.status, a.created_at
            FROM appointments a
            JOIN users u ON u.id = a.user_id
            WHERE u.username = ?
            ORDER BY a.date ASC, a.id ASC
            "#,
        )
        .bind(username)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Every appointment across all users, earliest first.
    pub async fn list_all(db: &SqlitePool) -> Result<Vec<AppointmentWithOwner>, StoreError> {
        let rows = sqlx::query_as::<_, AppointmentWithOwner>(
            r#"
            SELECT a.id, a.user_id, a.appointment_type, a.sub_type, a.date, a.status, a.created_at,
                   u.username, u.name AS owner_name
            FROM appointments a
            JOIN users u ON u.id = a.user_id
            ORDER BY a.date ASC, a.id ASC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Overwrite type, service and date. Returns `false` when no row has `id`.
    pub async fn update(
        db: &SqlitePool,
        id: i64,
        appointment_type: &str,
        sub_type: &str,
        date: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        let date = normalize_utc(date)?;
        let result = sqlx::query(
            r#"
            UPDATE appointments
            SET appointment_type = ?, sub_type = ?, date = ?
            WHERE id = ?
            "#,
        )
        .bind(appointment_type)
        .bind(sub_type)
        .bind(date)
        .bind(id)
        .execute(db)
        .await?;

        let found = result.rows_affected() > 0;
        debug!(appointment_id = id, found, "appointment update");
        Ok(found)
    }

    /// Returns `false` when no row has `id`.
    pub async fn delete(db: &SqlitePool, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;

        let found = result.rows_affected() > 0;
        debug!(appointment_id = id, found, "appointment delete");
        Ok(found)
    }

    pub async fn count(db: &SqlitePool) -> Result<i64, StoreError> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM appointments")
            .fetch_one(db)
            .await?;
        Ok(n)
    }
}
