// Application state shared across all modules

use std::sync::Arc;

use super::config::AppConfig;
use crate::auth::AuthService;
use crate::categories::CategoriesService;
use crate::oauth::OAuthService;
use crate::profile::ProfileService;

/// Read-only after startup; handlers receive it as `Extension<Arc<AppState>>`.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
    pub oauth: Arc<OAuthService>,
    pub profile: Arc<ProfileService>,
    pub categories: Arc<CategoriesService>,
}
