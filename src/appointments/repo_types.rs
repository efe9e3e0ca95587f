use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::error::StoreError;

pub const STATUS_CONFIRMED: &str = "confirmed";

/// Appointment record in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: i64,
    pub user_id: i64,
    pub appointment_type: String,
    pub sub_type: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Appointment joined with the identity of the user who booked it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AppointmentWithOwner {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub appointment: Appointment,
    pub username: String,
    pub owner_name: String,
}

/// Shift to UTC and drop sub-second precision. Stored dates are compared as
/// text, which only orders correctly when every value has the same shape:
/// a four-digit year between 1 and 9999.
pub fn normalize_utc(date: OffsetDateTime) -> Result<OffsetDateTime, StoreError> {
    let utc = date
        .checked_to_offset(UtcOffset::UTC)
        .filter(|utc| (1..=9999).contains(&utc.year()))
        .ok_or(StoreError::InvalidDate)?;
    Ok(utc - Duration::nanoseconds(i64::from(utc.nanosecond())))
}
