//! # OAuth Module
//!
//! Social login through pluggable OAuth2 providers:
//! - `OAuthProvider` trait and the Google implementation
//! - `ProviderRegistry`, built once from configuration
//! - `OAuthService`, which verifies the CSRF state, talks to the provider and
//!   links the external identity to a local account in one transaction

pub mod google;
pub mod handlers;
pub mod provider;
pub mod registry;
pub mod routes;
pub mod service;


pub use provider::{OAuthProvider, OAuthUserInfo, ProviderError, ProviderKind, ProviderToken};
pub use registry::ProviderRegistry;
pub use routes::oauth_routes;
pub use service::OAuthService;
