use sqlx::SqlitePool;
use time::macros::datetime;
use tracing::info;

use crate::appointments::Appointment;
use crate::auth::{Role, User};
use crate::error::StoreError;

const DEMO_USERS: &[(&str, &str, &str, Role)] = &[
    ("user1", "John Doe", "password1", Role::User),
    ("user2", "Jane Smith", "password2", Role::User),
    ("admin", "Admin User", "admin123", Role::Admin),
];

/// Populate an empty database with demo accounts and one booking for the
/// first regular user. Tables that already hold rows are left alone.
pub async fn seed_demo_data(db: &SqlitePool) -> Result<(), StoreError> {
    if User::count(db).await? == 0 {
        for (username, name, password, role) in DEMO_USERS {
            User::register(db, username, name, password, *role).await?;
        }
        info!(users = DEMO_USERS.len(), "seeded demo users");
    }

    if Appointment::count(db).await? == 0 {
        match Appointment::create(
            db,
            "user1",
            "Consultation",
            "Dental consult",
            datetime!(2023-12-15 10:00 UTC),
        )
        .await
        {
            Ok(id) => info!(appointment_id = id, "seeded demo appointment"),
            // user1 may not exist when users were created some other way
            Err(StoreError::UserNotFound) => {}
            Err(e) => return Err(e),
        }
    }

    Ok(())
}
