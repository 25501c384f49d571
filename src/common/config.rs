// src/common/config.rs
//! Environment-driven application configuration
//!
//! Everything is read once at startup (after `.env` is loaded) and shared
//! read-only for the lifetime of the process.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const DEV_JWT_SECRET: &str = "replace_with_strong_secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration: Duration,
}

/// Argon2 cost parameters. Stored hashes carry their own parameters,
/// so raising these only affects newly created hashes.
#[derive(Debug, Clone, Copy)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        // OWASP minimum recommendation for Argon2id
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

impl OAuthProviderConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }

    fn from_env(prefix: &str, default_redirect: &str) -> Self {
        Self {
            client_id: env::var(format!("{}_CLIENT_ID", prefix)).unwrap_or_default(),
            client_secret: env::var(format!("{}_CLIENT_SECRET", prefix)).unwrap_or_default(),
            redirect_url: env::var(format!("{}_REDIRECT_URL", prefix))
                .unwrap_or_else(|_| default_redirect.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OAuthConfig {
    pub google: OAuthProviderConfig,
    pub facebook: OAuthProviderConfig,
    pub twitter: OAuthProviderConfig,
    /// Upper bound for each outbound provider request
    pub http_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub path: PathBuf,
    pub max_size: usize,
    /// Lowercase extensions without the leading dot
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./uploads/avatars"),
            max_size: 2 * 1024 * 1024,
            allowed_types: ["jpg", "jpeg", "png", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub reset_db: bool,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub oauth: OAuthConfig,
    pub upload: UploadConfig,
    pub frontend_url: String,
    /// Forces the `Secure` attribute on auth cookies even for plain HTTP requests
    pub secure_cookies: bool,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ => {
                warn!("JWT_SECRET not set - falling back to the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let defaults = PasswordConfig::default();
        let upload_defaults = UploadConfig::default();

        let allowed_types = match env::var("UPLOAD_ALLOWED_TYPES") {
            Ok(raw) => raw
                .split(',')
                .map(|s| s.trim().trim_start_matches('.').to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => upload_defaults.allowed_types,
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            port: parse_var("PORT", 8080)?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://foods_drinks.db".to_string()),
            reset_db: parse_var("RESET_DB", false)?,
            jwt: JwtConfig {
                secret: jwt_secret,
                expiration: Duration::from_secs(parse_var("JWT_EXPIRATION_SECS", 86_400u64)?),
            },
            password: PasswordConfig {
                memory_kib: parse_var("PASSWORD_HASH_MEMORY_KIB", defaults.memory_kib)?,
                iterations: parse_var("PASSWORD_HASH_ITERATIONS", defaults.iterations)?,
            },
            oauth: OAuthConfig {
                google: OAuthProviderConfig::from_env(
                    "GOOGLE",
                    "http://localhost:8080/api/v1/auth/oauth/google/callback",
                ),
                facebook: OAuthProviderConfig::from_env(
                    "FACEBOOK",
                    "http://localhost:8080/api/v1/auth/oauth/facebook/callback",
                ),
                twitter: OAuthProviderConfig::from_env(
                    "TWITTER",
                    "http://localhost:8080/api/v1/auth/oauth/twitter/callback",
                ),
                http_timeout: Duration::from_secs(parse_var("OAUTH_HTTP_TIMEOUT_SECS", 10u64)?),
            },
            upload: UploadConfig {
                path: env::var("UPLOAD_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(upload_defaults.path),
                max_size: parse_var("UPLOAD_MAX_SIZE", upload_defaults.max_size)?,
                allowed_types,
            },
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000/auth/callback".to_string()),
            secure_cookies: parse_var("SECURE_COOKIES", false)?,
            cors_origins,
        })
    }
}

/// Reads `key` and parses it, falling back to `default` when unset or blank.
fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .to_lowercase()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value: raw })
        }
        _ => Ok(default),
    }
}
