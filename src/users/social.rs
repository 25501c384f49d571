//! Social identity store: links between users and OAuth provider accounts

use chrono::Utc;
use sqlx::{FromRow, SqliteConnection};

use super::store::StoreError;
use crate::common::generate_social_auth_id;

/// One (provider, provider user id) pair linked to a local user.
///
/// Provider tokens are stored opaquely and never serialized to clients.
#[derive(FromRow, Debug, Clone)]
pub struct SocialIdentity {
    pub id: String,
    pub user_id: String,
    pub provider: String,
    pub provider_user_id: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewSocialIdentity<'a> {
    pub user_id: &'a str,
    pub provider: &'a str,
    pub provider_user_id: &'a str,
    pub access_token: Option<&'a str>,
    pub refresh_token: Option<&'a str>,
}

const SELECT_SOCIAL: &str = r#"
    SELECT id, user_id, provider, provider_user_id, access_token, refresh_token,
           created_at, updated_at
    FROM social_auths
"#;

pub struct SocialAuthRepository;

impl SocialAuthRepository {
    pub async fn find_by_provider_and_external_id(
        conn: &mut SqliteConnection,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<SocialIdentity, StoreError> {
        let identity = sqlx::query_as::<_, SocialIdentity>(&format!(
            "{} WHERE provider = ? AND provider_user_id = ?",
            SELECT_SOCIAL
        ))
        .bind(provider)
        .bind(provider_user_id)
        .fetch_optional(conn)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(identity)
    }

    pub async fn find_by_user_and_provider(
        conn: &mut SqliteConnection,
        user_id: &str,
        provider: &str,
    ) -> Result<SocialIdentity, StoreError> {
        let identity = sqlx::query_as::<_, SocialIdentity>(&format!(
            "{} WHERE user_id = ? AND provider = ? ORDER BY created_at ASC LIMIT 1",
            SELECT_SOCIAL
        ))
        .bind(user_id)
        .bind(provider)
        .fetch_optional(conn)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(identity)
    }

    /// Insert a link; a second link for the same (provider, provider user id)
    /// fails with `StoreError::Conflict`.
    pub async fn create(
        conn: &mut SqliteConnection,
        identity: &NewSocialIdentity<'_>,
    ) -> Result<SocialIdentity, StoreError> {
        let id = generate_social_auth_id();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO social_auths (
                id, user_id, provider, provider_user_id, access_token, refresh_token,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(identity.user_id)
        .bind(identity.provider)
        .bind(identity.provider_user_id)
        .bind(identity.access_token)
        .bind(identity.refresh_token)
        .bind(&now)
        .bind(&now)
        .execute(conn)
        .await?;

        Ok(SocialIdentity {
            id,
            user_id: identity.user_id.to_string(),
            provider: identity.provider.to_string(),
            provider_user_id: identity.provider_user_id.to_string(),
            access_token: identity.access_token.map(str::to_string),
            refresh_token: identity.refresh_token.map(str::to_string),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Replace the access token. The refresh token is only replaced when the
    /// provider issued a new one.
    pub async fn update_tokens(
        conn: &mut SqliteConnection,
        id: &str,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE social_auths
            SET access_token = ?, refresh_token = COALESCE(?, refresh_token), updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(access_token)
        .bind(refresh_token)
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
