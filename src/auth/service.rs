//! Local credential authentication: register, login, token validation, profile

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::models::{AuthResponse, Claims, LoginRequest, RegisterRequest, UpdateProfileRequest};
use super::password::{PasswordError, PasswordHasher};
use super::tokens::{TokenError, TokenIssuer};
use crate::common::helpers::trimmed_or_none;
use crate::common::{normalize_email, safe_email_log, ApiError, ValidationResult, Validator};
use crate::users::{NewUser, StoreError, User, UserRepository, UserResponse, UserRole, UserStatus};

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email, OAuth-only account or wrong password
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("user account is inactive")]
    UserInactive,

    #[error("user account is banned")]
    UserBanned,

    #[error("email already exists")]
    EmailAlreadyExists,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("malformed token")]
    MalformedToken,

    #[error("user not found")]
    UserNotFound,

    #[error("validation failed")]
    Validation(ValidationResult),

    #[error("oauth provider not supported: {0}")]
    ProviderNotSupported(String),

    #[error("oauth state mismatch")]
    StateMismatch,

    #[error("failed to exchange oauth code: {0}")]
    CodeExchangeFailed(String),

    #[error("failed to get user info from provider: {0}")]
    UserInfoFetchFailed(String),

    #[error("email is required from oauth provider")]
    OAuthEmailRequired,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Store(err.into())
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => AuthError::InvalidToken,
            TokenError::Malformed => AuthError::MalformedToken,
            TokenError::Signing(e) => AuthError::Internal(format!("token signing failed: {}", e)),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::InvalidCredentials => {
                ApiError::Unauthorized("invalid_credentials", "Invalid email or password".into())
            }
            AuthError::UserInactive => ApiError::Forbidden("user_inactive", message),
            AuthError::UserBanned => ApiError::Forbidden("user_banned", message),
            AuthError::EmailAlreadyExists => ApiError::Conflict("email_exists", message),
            AuthError::InvalidToken | AuthError::MalformedToken => {
                ApiError::Unauthorized("invalid_token", message)
            }
            AuthError::UserNotFound => ApiError::NotFound("user_not_found", message),
            AuthError::Validation(result) => result.into(),
            AuthError::ProviderNotSupported(_) => {
                ApiError::BadRequest("provider_not_supported", message)
            }
            AuthError::StateMismatch => ApiError::BadRequest("state_mismatch", message),
            AuthError::CodeExchangeFailed(_) => {
                ApiError::UpstreamFailure("code_exchange_failed", "Failed to exchange authorization code".into())
            }
            AuthError::UserInfoFetchFailed(_) => {
                ApiError::UpstreamFailure("user_info_failed", "Failed to get user info from provider".into())
            }
            AuthError::OAuthEmailRequired => ApiError::BadRequest("email_required", message),
            AuthError::Store(StoreError::NotFound) => ApiError::NotFound("user_not_found", "User not found".into()),
            AuthError::Store(e) => e.into(),
            AuthError::Password(e) => ApiError::InternalServer(e.to_string()),
            AuthError::Internal(msg) => ApiError::InternalServer(msg),
        }
    }
}

/// Status gate applied before any token is issued.
pub fn ensure_active(user: &User) -> Result<(), AuthError> {
    match user.status {
        UserStatus::Active => Ok(()),
        UserStatus::Inactive => Err(AuthError::UserInactive),
        UserStatus::Banned => Err(AuthError::UserBanned),
    }
}

pub struct AuthService {
    db: SqlitePool,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(db: SqlitePool, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        Self { db, hasher, tokens }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let validation = request.validate(&request);
        if !validation.is_valid {
            return Err(AuthError::Validation(validation));
        }

        let email = normalize_email(&request.email);

        {
            let mut conn = self.db.acquire().await?;
            if UserRepository::exists_by_email(&mut conn, &email).await? {
                warn!(email = %safe_email_log(&email), "Registration rejected: email already exists");
                return Err(AuthError::EmailAlreadyExists);
            }
        }

        let password_hash = self.hasher.hash_async(request.password).await?;

        let new_user = NewUser {
            email,
            password_hash: Some(password_hash),
            full_name: request.full_name.trim().to_string(),
            avatar_url: None,
            role: UserRole::User,
            status: UserStatus::Active,
            email_verified_at: None,
        };

        let mut conn = self.db.acquire().await?;
        let user = UserRepository::create(&mut conn, &new_user)
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration
                StoreError::Conflict(_) => AuthError::EmailAlreadyExists,
                other => other.into(),
            })?;

        info!(
            user_id = %user.id,
            email = %safe_email_log(&user.email),
            "User registered"
        );

        self.issue_response(&user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let validation = request.validate(&request);
        if !validation.is_valid {
            return Err(AuthError::Validation(validation));
        }

        let email = normalize_email(&request.email);

        let user = {
            let mut conn = self.db.acquire().await?;
            match UserRepository::find_by_email(&mut conn, &email).await {
                Ok(user) => user,
                Err(StoreError::NotFound) => {
                    debug!(email = %safe_email_log(&email), "Login failed: unknown email");
                    return Err(AuthError::InvalidCredentials);
                }
                Err(e) => return Err(e.into()),
            }
        };

        let Some(password_hash) = user.password_hash.clone() else {
            debug!(user_id = %user.id, "Login failed: account has no local password");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify_async(request.password, password_hash).await? {
            debug!(user_id = %user.id, "Login failed: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        ensure_active(&user).map_err(|e| {
            warn!(user_id = %user.id, status = %user.status, "Login refused for non-active account");
            e
        })?;

        info!(user_id = %user.id, "User logged in");

        self.issue_response(&user)
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        Ok(self.tokens.verify(token)?)
    }

    pub async fn get_user_by_id(&self, user_id: &str) -> Result<User, AuthError> {
        let mut conn = self.db.acquire().await?;
        UserRepository::find_by_id(&mut conn, user_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AuthError::UserNotFound,
                other => other.into(),
            })
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        request: UpdateProfileRequest,
    ) -> Result<User, AuthError> {
        let validation = request.validate(&request);
        if !validation.is_valid {
            return Err(AuthError::Validation(validation));
        }

        let current = self.get_user_by_id(user_id).await?;

        let full_name = request.full_name.trim().to_string();
        let phone = match request.phone.as_deref() {
            Some(phone) => trimmed_or_none(Some(phone)),
            None => current.phone,
        };
        let address = match request.address.as_deref() {
            Some(address) => trimmed_or_none(Some(address)),
            None => current.address,
        };

        let mut conn = self.db.acquire().await?;
        UserRepository::update_profile_fields(
            &mut conn,
            user_id,
            &full_name,
            phone.as_deref(),
            address.as_deref(),
        )
        .await
        .map_err(|e| match e {
            StoreError::NotFound => AuthError::UserNotFound,
            other => other.into(),
        })?;

        info!(user_id = %user_id, "Profile updated");

        // Re-read so the response reflects columns changed by others
        UserRepository::find_by_id(&mut conn, user_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AuthError::UserNotFound,
                other => other.into(),
            })
    }

    /// Sign a token for `user` and wrap it in the response envelope.
    pub fn issue_response(&self, user: &User) -> Result<AuthResponse, AuthError> {
        let issued = self.tokens.issue(user).map_err(|e| {
            error!(user_id = %user.id, error = %e, "Failed to sign access token");
            AuthError::from(e)
        })?;

        Ok(AuthResponse::bearer(
            issued.token,
            issued.expires_in,
            UserResponse::from(user),
        ))
    }
}
