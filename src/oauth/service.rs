//! OAuth login orchestration: state generation, callback handling and the
//! transactional find-or-create/link of local accounts.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use super::provider::{OAuthUserInfo, ProviderError, ProviderKind, ProviderToken};
use super::registry::ProviderRegistry;
use crate::auth::{ensure_active, AuthError, AuthResponse, AuthService};
use crate::common::safe_email_log;
use crate::users::{
    NewSocialIdentity, NewUser, SocialAuthRepository, StoreError, User, UserRepository, UserRole,
    UserStatus,
};

/// Number of random bytes behind each state value
const STATE_BYTES: usize = 32;

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::CodeExchange(msg) => AuthError::CodeExchangeFailed(msg),
            ProviderError::UserInfo(msg) => AuthError::UserInfoFetchFailed(msg),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OAuthInitiation {
    pub url: String,
    pub provider: &'static str,
    pub state: String,
}

/// Fresh anti-CSRF state: 256 bits from the OS RNG, URL-safe base64.
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Constant-time comparison; a missing or empty value never matches.
pub fn states_match(presented: &str, stored: Option<&str>) -> bool {
    match stored {
        Some(stored) if !stored.is_empty() && !presented.is_empty() => {
            presented.as_bytes().ct_eq(stored.as_bytes()).into()
        }
        _ => false,
    }
}

pub struct OAuthService {
    db: SqlitePool,
    registry: ProviderRegistry,
    auth: Arc<AuthService>,
}

impl OAuthService {
    pub fn new(db: SqlitePool, registry: ProviderRegistry, auth: Arc<AuthService>) -> Self {
        Self { db, registry, auth }
    }

    pub fn supported_providers(&self) -> Vec<&'static str> {
        self.registry.names()
    }

    pub fn is_supported(&self, provider: &str) -> bool {
        self.registry.get_by_name(provider).is_some()
    }

    pub fn initiate(&self, provider: &str) -> Result<OAuthInitiation, AuthError> {
        let adapter = self
            .registry
            .get_by_name(provider)
            .ok_or_else(|| AuthError::ProviderNotSupported(provider.to_string()))?;

        let state = generate_state();
        let url = adapter.auth_url(&state);

        debug!(provider = adapter.name(), "Generated OAuth authorization URL");

        Ok(OAuthInitiation {
            url,
            provider: adapter.name(),
            state,
        })
    }

    /// Completes an OAuth login.
    ///
    /// `stored_state` is the value the browser carried back (cookie); it must
    /// equal `presented_state` or nothing is sent to the provider.
    pub async fn handle_callback(
        &self,
        provider: &str,
        code: &str,
        presented_state: &str,
        stored_state: Option<&str>,
    ) -> Result<AuthResponse, AuthError> {
        let adapter = self
            .registry
            .get_by_name(provider)
            .ok_or_else(|| AuthError::ProviderNotSupported(provider.to_string()))?;

        if !states_match(presented_state, stored_state) {
            warn!(provider = adapter.name(), "OAuth state mismatch");
            return Err(AuthError::StateMismatch);
        }

        let token = adapter.exchange_code(code).await?;
        let info = adapter.fetch_profile(&token).await?;

        debug!(
            provider = adapter.name(),
            provider_user_id = %info.provider_user_id,
            email = %safe_email_log(&info.email),
            "Fetched OAuth profile"
        );

        let user = self.link_identity(adapter.kind(), &token, &info).await?;

        // Linking is committed even when the account may not sign in
        ensure_active(&user).map_err(|e| {
            warn!(user_id = %user.id, status = %user.status, "OAuth login refused for non-active account");
            e
        })?;

        info!(user_id = %user.id, provider = adapter.name(), "User logged in via OAuth");

        self.auth.issue_response(&user)
    }

    /// Runs the find-or-create/link transaction, retrying once when a
    /// concurrent callback won the race for the same identity or email.
    async fn link_identity(
        &self,
        kind: ProviderKind,
        token: &ProviderToken,
        info: &OAuthUserInfo,
    ) -> Result<User, AuthError> {
        match self.link_identity_once(kind, token, info).await {
            Err(AuthError::Store(e)) if e.is_contention() => {
                warn!(
                    provider = %kind,
                    provider_user_id = %info.provider_user_id,
                    error = %e,
                    "Concurrent OAuth link detected, retrying"
                );
                self.link_identity_once(kind, token, info).await
            }
            other => other,
        }
    }

    async fn link_identity_once(
        &self,
        kind: ProviderKind,
        token: &ProviderToken,
        info: &OAuthUserInfo,
    ) -> Result<User, AuthError> {
        let mut tx = self.db.begin().await?;
        // Dropping `tx` on any early return rolls the transaction back
        let user = find_or_create_user(&mut tx, kind, token, info).await?;
        tx.commit().await?;
        Ok(user)
    }
}

/// Reconciles an external identity with zero or one local accounts.
///
/// Must run on a transaction's connection so that user and identity rows are
/// written together or not at all.
pub async fn find_or_create_user(
    conn: &mut SqliteConnection,
    kind: ProviderKind,
    token: &ProviderToken,
    info: &OAuthUserInfo,
) -> Result<User, AuthError> {
    let provider = kind.as_str();

    match SocialAuthRepository::find_by_provider_and_external_id(
        &mut *conn,
        provider,
        &info.provider_user_id,
    )
    .await
    {
        Ok(identity) => {
            let user = UserRepository::find_by_id(&mut *conn, &identity.user_id)
                .await
                .map_err(|e| match e {
                    StoreError::NotFound => AuthError::UserNotFound,
                    other => other.into(),
                })?;

            if let Err(e) = SocialAuthRepository::update_tokens(
                &mut *conn,
                &identity.id,
                &token.access_token,
                token.refresh_token.as_deref(),
            )
            .await
            {
                warn!(
                    social_auth_id = %identity.id,
                    error = %e,
                    "Failed to refresh stored provider tokens"
                );
            }

            return Ok(user);
        }
        Err(StoreError::NotFound) => {}
        Err(e) => return Err(e.into()),
    }

    let existing = if info.email.is_empty() {
        None
    } else {
        match UserRepository::find_by_email(&mut *conn, &info.email).await {
            Ok(user) => Some(user),
            Err(StoreError::NotFound) => None,
            Err(e) => return Err(e.into()),
        }
    };

    let user = match existing {
        Some(user) => {
            info!(user_id = %user.id, provider, "Linking OAuth identity to existing account");
            user
        }
        None => {
            if info.email.is_empty() {
                return Err(AuthError::OAuthEmailRequired);
            }

            let new_user = NewUser {
                email: info.email.clone(),
                password_hash: None,
                full_name: display_name(info),
                avatar_url: info.avatar_url.clone(),
                role: UserRole::User,
                status: UserStatus::Active,
                email_verified_at: info.email_verified.then(|| Utc::now().to_rfc3339()),
            };

            let user = UserRepository::create(&mut *conn, &new_user).await?;
            info!(
                user_id = %user.id,
                email = %safe_email_log(&user.email),
                provider,
                "Created account from OAuth profile"
            );
            user
        }
    };

    SocialAuthRepository::create(
        &mut *conn,
        &NewSocialIdentity {
            user_id: &user.id,
            provider,
            provider_user_id: &info.provider_user_id,
            access_token: Some(&token.access_token),
            refresh_token: token.refresh_token.as_deref(),
        },
    )
    .await?;

    Ok(user)
}

/// Provider name, falling back to the email's local part.
fn display_name(info: &OAuthUserInfo) -> String {
    let name = info.name.trim();
    if !name.is_empty() {
        return name.to_string();
    }
    info.email
        .split('@')
        .next()
        .unwrap_or_default()
        .to_string()
}
