use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Body for booking and editing an appointment.
#[derive(Debug, Deserialize)]
pub struct AppointmentRequest {
    pub appointment_type: String,
    pub sub_type: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookedResponse {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct CatalogEntry {
    pub category: &'static str,
    pub sub_types: &'static [&'static str],
}
