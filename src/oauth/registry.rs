//! Immutable set of configured OAuth providers

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::google::GoogleProvider;
use super::provider::{OAuthProvider, ProviderKind};
use crate::common::config::OAuthConfig;

/// Built once at startup and shared read-only afterwards.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn OAuthProvider>>,
}

impl ProviderRegistry {
    /// Registers every provider whose client id and secret are both set.
    pub fn from_config(config: &OAuthConfig) -> Result<Self, reqwest::Error> {
        let mut registry = Self::default();

        if config.google.is_configured() {
            let google = GoogleProvider::new(&config.google, config.http_timeout)?;
            registry = registry.with_provider(Arc::new(google));
        }

        for (kind, provider_config) in [
            (ProviderKind::Facebook, &config.facebook),
            (ProviderKind::Twitter, &config.twitter),
        ] {
            if provider_config.is_configured() {
                warn!(provider = %kind, "OAuth credentials configured but provider is not supported yet - skipping");
            }
        }

        info!(providers = ?registry.names(), "OAuth provider registry initialised");

        Ok(registry)
    }

    pub fn with_provider(mut self, provider: Arc<dyn OAuthProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn OAuthProvider>> {
        self.providers.get(&kind).cloned()
    }

    /// Looks a provider up by its URL name (`google`, ...).
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn OAuthProvider>> {
        name.parse::<ProviderKind>().ok().and_then(|kind| self.get(kind))
    }

    /// Registered provider names in a stable order
    pub fn names(&self) -> Vec<&'static str> {
        ProviderKind::ALL
            .iter()
            .filter(|kind| self.providers.contains_key(*kind))
            .map(|kind| kind.as_str())
            .collect()
    }
}
