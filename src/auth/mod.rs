//! # Auth Module
//!
//! Local credential authentication and the pieces shared with OAuth login:
//! - Argon2id password hashing
//! - JWT access token issuing and validation
//! - `AuthedUser` / `AdminUser` extractors for protected routes
//! - Cookie helpers used by the browser-facing OAuth flow

pub mod cookies;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod password;
pub mod routes;
pub mod service;
pub mod tokens;
pub mod validators;


pub use extractors::{AdminUser, AuthedUser};
pub use models::{AuthResponse, Claims};
pub use password::PasswordHasher;
pub use routes::auth_routes;
pub use service::{ensure_active, AuthError, AuthService};
pub use tokens::TokenIssuer;
