use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo_types::{Role, User};
use crate::error::StoreError;

impl User {
    /// Find a user by username.
    pub async fn find_by_username(
        db: &SqlitePool,
        username: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, name, password_hash, role
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, name, password_hash, role
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with a hashed password.
    ///
    /// Fails with [`StoreError::DuplicateUsername`] and writes nothing when the
    /// username is already taken.
    pub async fn register(
        db: &SqlitePool,
        username: &str,
        name: &str,
        password: &str,
        role: Role,
    ) -> Result<User, StoreError> {
        if Self::find_by_username(db, username).await?.is_some() {
            return Err(StoreError::DuplicateUsername);
        }

        let hash = hash_password(password)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, name, password_hash, role)
            VALUES (?, ?, ?, ?)
            RETURNING id, username, name, password_hash, role
            "#,
        )
        .bind(username)
        .bind(name)
        .bind(&hash)
        .bind(role)
        .fetch_one(db)
        .await
        .map_err(|e| {
            // lost a race with a concurrent registration
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return StoreError::DuplicateUsername;
                }
            }
            StoreError::Database(e)
        })?;

        info!(
            user_id = user.id,
            username = %user.username,
            role = user.role.as_str(),
            "user registered"
        );
        Ok(user)
    }

    /// Return the user only when the password matches. Unknown usernames and
    /// wrong passwords are indistinguishable to the caller.
    pub async fn verify(
        db: &SqlitePool,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, StoreError> {
        let Some(user) = Self::find_by_username(db, username).await? else {
            debug!(username, "verify: unknown username");
            return Ok(None);
        };

        if verify_password(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            debug!(user_id = user.id, "verify: password mismatch");
            Ok(None)
        }
    }

    pub async fn count(db: &SqlitePool) -> Result<i64, StoreError> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(db)
            .await?;
        Ok(n)
    }
}
