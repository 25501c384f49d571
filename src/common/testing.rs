// Shared fixtures for database-backed tests

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::config::{AppConfig, JwtConfig, OAuthConfig, PasswordConfig, UploadConfig};
use super::state::AppState;
use super::migrations::run_migrations;
use crate::auth::{AuthService, PasswordHasher, TokenIssuer};
use crate::categories::CategoriesService;
use crate::oauth::{
    OAuthProvider, OAuthService, OAuthUserInfo, ProviderError, ProviderKind, ProviderRegistry,
    ProviderToken,
};
use crate::profile::{LocalAvatarStorage, ProfileService};
use crate::users::{NewUser, User, UserRepository, UserRole, UserStatus};

/// Fresh in-memory database with the full schema.
///
/// A single connection keeps every query on the same in-memory database;
/// transactions therefore serialize behind the pool.
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("in-memory sqlite url")
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("connect to in-memory sqlite");

    run_migrations(&pool, false)
        .await
        .expect("migrations should succeed");

    pool
}

pub fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        password_hash: None,
        full_name: "Test User".to_string(),
        avatar_url: None,
        role: UserRole::User,
        status: UserStatus::Active,
        email_verified_at: None,
    }
}

pub async fn insert_user(pool: &SqlitePool, new_user: NewUser) -> User {
    let mut conn = pool.acquire().await.expect("acquire connection");
    UserRepository::create(&mut conn, &new_user)
        .await
        .expect("insert test user")
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("count rows");
    count
}

pub const TEST_JWT_SECRET: &str = "test_secret_key";

pub fn cheap_password_config() -> PasswordConfig {
    PasswordConfig {
        memory_kib: 8,
        iterations: 1,
    }
}

pub fn test_token_issuer() -> TokenIssuer {
    TokenIssuer::new(&JwtConfig {
        secret: TEST_JWT_SECRET.to_string(),
        expiration: Duration::from_secs(3600),
    })
}

pub fn test_auth_service(pool: &SqlitePool) -> AuthService {
    let hasher = PasswordHasher::new(cheap_password_config()).expect("cheap argon2 params");
    AuthService::new(pool.clone(), hasher, test_token_issuer())
}

/// Inserts a user with a local password and the given status.
pub async fn insert_user_with_password(
    pool: &SqlitePool,
    email: &str,
    password: &str,
    status: UserStatus,
) -> User {
    let hasher = PasswordHasher::new(cheap_password_config()).expect("cheap argon2 params");
    let mut user = new_user(email);
    user.password_hash = Some(hasher.hash(password).expect("hash test password"));
    user.status = status;
    insert_user(pool, user).await
}

/// File-backed pool with several connections, for tests that need real
/// concurrent transactions.
pub async fn file_pool(dir: &Path) -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(dir.join("test.db"))
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .expect("open file-backed sqlite");

    run_migrations(&pool, false)
        .await
        .expect("migrations should succeed");

    pool
}

/// Scripted OAuth provider that counts how often it is called.
pub struct MockProvider {
    profile: OAuthUserInfo,
    refresh_token: Option<String>,
    fail_exchange: bool,
    exchange_calls: AtomicUsize,
    profile_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(profile: OAuthUserInfo) -> Self {
        Self {
            profile,
            refresh_token: Some("refresh-token".to_string()),
            fail_exchange: false,
            exchange_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
        }
    }

    pub fn without_refresh_token(mut self) -> Self {
        self.refresh_token = None;
        self
    }

    pub fn failing_exchange(mut self) -> Self {
        self.fail_exchange = true;
        self
    }

    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OAuthProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn auth_url(&self, state: &str) -> String {
        format!("https://provider.test/auth?state={}", state)
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderToken, ProviderError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_exchange {
            return Err(ProviderError::CodeExchange("invalid_grant".to_string()));
        }
        Ok(ProviderToken {
            access_token: format!("access-{}", code),
            refresh_token: self.refresh_token.clone(),
            expires_in: Some(3600),
            token_type: Some("Bearer".to_string()),
        })
    }

    async fn fetch_profile(&self, _token: &ProviderToken) -> Result<OAuthUserInfo, ProviderError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.profile.clone())
    }
}

pub fn google_profile(provider_user_id: &str, email: &str, verified: bool) -> OAuthUserInfo {
    OAuthUserInfo {
        provider_user_id: provider_user_id.to_string(),
        email: email.to_string(),
        name: "Oauth Person".to_string(),
        avatar_url: Some("https://lh3.googleusercontent.com/a/pic".to_string()),
        email_verified: verified,
    }
}

pub fn test_oauth_service(pool: &SqlitePool, provider: Arc<MockProvider>) -> OAuthService {
    let registry = ProviderRegistry::default().with_provider(provider);
    OAuthService::new(pool.clone(), registry, Arc::new(test_auth_service(pool)))
}

pub const TEST_FRONTEND_URL: &str = "http://localhost:3000/auth/callback";

pub fn test_config(upload_dir: &Path) -> AppConfig {
    AppConfig {
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        reset_db: false,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            expiration: Duration::from_secs(3600),
        },
        password: cheap_password_config(),
        oauth: OAuthConfig::default(),
        upload: UploadConfig {
            path: upload_dir.to_path_buf(),
            ..Default::default()
        },
        frontend_url: TEST_FRONTEND_URL.to_string(),
        secure_cookies: false,
        cors_origins: vec!["http://localhost:3000".to_string()],
    }
}

/// Full application state over `pool`, with `provider` as the only OAuth provider.
pub fn test_app_state(
    pool: &SqlitePool,
    provider: Arc<MockProvider>,
    upload_dir: &Path,
) -> Arc<AppState> {
    let config = Arc::new(test_config(upload_dir));
    let auth = Arc::new(test_auth_service(pool));
    let registry = ProviderRegistry::default().with_provider(provider);

    Arc::new(AppState {
        config: config.clone(),
        auth: auth.clone(),
        oauth: Arc::new(OAuthService::new(pool.clone(), registry, auth)),
        profile: Arc::new(ProfileService::new(
            pool.clone(),
            Arc::new(LocalAvatarStorage::new(upload_dir)),
            config.upload.clone(),
        )),
        categories: Arc::new(CategoriesService::new(pool.clone())),
    })
}
