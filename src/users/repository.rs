//! Credential store: user account persistence

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use super::models::{NewUser, User};
use super::store::StoreError;
use crate::common::generate_user_id;

const SELECT_USER: &str = r#"
    SELECT id, email, password_hash, full_name, phone, address, avatar_url,
           role, status, email_verified_at, created_at, updated_at, deleted_at
    FROM users
"#;

pub struct UserRepository;

impl UserRepository {
    /// Find a non-deleted user by ID
    pub async fn find_by_id(conn: &mut SqliteConnection, id: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "{} WHERE id = ? AND deleted_at IS NULL",
            SELECT_USER
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(user)
    }

    /// Find a non-deleted user by (already normalised) email
    pub async fn find_by_email(
        conn: &mut SqliteConnection,
        email: &str,
    ) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "{} WHERE email = ? AND deleted_at IS NULL",
            SELECT_USER
        ))
        .bind(email)
        .fetch_optional(conn)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(user)
    }

    pub async fn exists_by_email(
        conn: &mut SqliteConnection,
        email: &str,
    ) -> Result<bool, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users WHERE email = ? AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_one(conn)
        .await?;

        Ok(count > 0)
    }

    /// Insert a user and return the stored row.
    ///
    /// A duplicate live email surfaces as `StoreError::Conflict`.
    pub async fn create(conn: &mut SqliteConnection, new_user: &NewUser) -> Result<User, StoreError> {
        let id = generate_user_id();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, password_hash, full_name, avatar_url, role, status,
                email_verified_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.full_name)
        .bind(&new_user.avatar_url)
        .bind(new_user.role)
        .bind(new_user.status)
        .bind(&new_user.email_verified_at)
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        debug!(user_id = %id, "Inserted user row");

        Self::find_by_id(conn, &id).await
    }

    /// Persist every mutable column of `user` and bump `updated_at`.
    ///
    /// Writes `status` and `role` back as loaded; request handlers use the
    /// column-scoped writes below so a concurrent ban is never overwritten.
    pub async fn update(conn: &mut SqliteConnection, user: &mut User) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = ?, password_hash = ?, full_name = ?, phone = ?, address = ?,
                avatar_url = ?, role = ?, status = ?, email_verified_at = ?, updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(&user.avatar_url)
        .bind(user.role)
        .bind(user.status)
        .bind(&user.email_verified_at)
        .bind(&now)
        .bind(&user.id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        user.updated_at = now;
        Ok(())
    }

    /// Write the self-service profile columns only.
    pub async fn update_profile_fields(
        conn: &mut SqliteConnection,
        id: &str,
        full_name: &str,
        phone: Option<&str>,
        address: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET full_name = ?, phone = ?, address = ?, updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(full_name)
        .bind(phone)
        .bind(address)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    /// Set or clear `avatar_url`, leaving every other column alone.
    pub async fn set_avatar_url(
        conn: &mut SqliteConnection,
        id: &str,
        avatar_url: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET avatar_url = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(avatar_url)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}
