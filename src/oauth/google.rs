// Google OAuth2 provider
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

use super::provider::{OAuthProvider, OAuthUserInfo, ProviderError, ProviderKind, ProviderToken};
use crate::common::config::OAuthProviderConfig;
use crate::common::normalize_email;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

const SCOPES: [&str; 3] = ["openid", "email", "profile"];

#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub auth: String,
    pub token: String,
    pub userinfo: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth: AUTH_ENDPOINT.to_string(),
            token: TOKEN_ENDPOINT.to_string(),
            userinfo: USERINFO_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    verified_email: bool,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GoogleProvider {
    client_id: String,
    client_secret: String,
    redirect_url: String,
    endpoints: GoogleEndpoints,
    client: Client,
}

impl GoogleProvider {
    pub fn new(config: &OAuthProviderConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_endpoints(config, timeout, GoogleEndpoints::default())
    }

    pub fn with_endpoints(
        config: &OAuthProviderConfig,
        timeout: Duration,
        endpoints: GoogleEndpoints,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client_id: config.client_id.trim().to_string(),
            client_secret: config.client_secret.trim().to_string(),
            redirect_url: config.redirect_url.clone(),
            endpoints,
            client,
        })
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn auth_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&state={}",
            self.endpoints.auth,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(&SCOPES.join(" ")),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderToken, ProviderError> {
        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        debug!("Exchanging Google authorization code for tokens");

        let response = self
            .client
            .post(&self.endpoints.token)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Google token request failed");
                ProviderError::CodeExchange(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Google token exchange rejected");
            return Err(ProviderError::CodeExchange(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let token = response.json::<ProviderToken>().await.map_err(|e| {
            error!(error = %e, "Failed to parse Google token response");
            ProviderError::CodeExchange(e.to_string())
        })?;

        if token.access_token.is_empty() {
            return Err(ProviderError::CodeExchange(
                "token response has no access_token".to_string(),
            ));
        }

        Ok(token)
    }

    async fn fetch_profile(&self, token: &ProviderToken) -> Result<OAuthUserInfo, ProviderError> {
        let response = self
            .client
            .get(&self.endpoints.userinfo)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Google userinfo request failed");
                ProviderError::UserInfo(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, "Google userinfo returned error status");
            return Err(ProviderError::UserInfo(format!("HTTP {}", status)));
        }

        let info = response.json::<GoogleUserInfo>().await.map_err(|e| {
            error!(error = %e, "Failed to parse Google userinfo response");
            ProviderError::UserInfo(e.to_string())
        })?;

        if info.id.trim().is_empty() {
            return Err(ProviderError::UserInfo("userinfo has no id".to_string()));
        }

        Ok(OAuthUserInfo {
            provider_user_id: info.id,
            email: info.email.as_deref().map(normalize_email).unwrap_or_default(),
            name: info.name.unwrap_or_default().trim().to_string(),
            avatar_url: info.picture.filter(|p| !p.trim().is_empty()),
            email_verified: info.verified_email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;
    use tokio::net::TcpListener;

    fn config() -> OAuthProviderConfig {
        OAuthProviderConfig {
            client_id: "client-123".to_string(),
            client_secret: "secret-456".to_string(),
            redirect_url: "http://localhost:8080/api/v1/auth/oauth/google/callback".to_string(),
        }
    }

    /// Serves `router` on an ephemeral port and returns its base URL.
    async fn spawn_stub(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn provider_for(base: &str, timeout: Duration) -> GoogleProvider {
        GoogleProvider::with_endpoints(
            &config(),
            timeout,
            GoogleEndpoints {
                auth: format!("{}/auth", base),
                token: format!("{}/token", base),
                userinfo: format!("{}/userinfo", base),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_auth_url_contents() {
        let provider = GoogleProvider::new(&config(), Duration::from_secs(5)).unwrap();
        let url = provider.auth_url("st4te-_value");

        assert!(url.starts_with(AUTH_ENDPOINT));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fapi%2Fv1%2Fauth%2Foauth%2Fgoogle%2Fcallback"
        ));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("state=st4te-_value"));
    }

    #[tokio::test]
    async fn test_exchange_and_fetch_profile() {
        let router = Router::new()
            .route(
                "/token",
                post(|body: String| async move {
                    assert!(body.contains("code=good-code"));
                    assert!(body.contains("grant_type=authorization_code"));
                    Json(json!({
                        "access_token": "access-abc",
                        "refresh_token": "refresh-def",
                        "expires_in": 3599,
                        "token_type": "Bearer"
                    }))
                }),
            )
            .route(
                "/userinfo",
                get(|headers: HeaderMap| async move {
                    let auth = headers.get("authorization").unwrap().to_str().unwrap();
                    assert_eq!(auth, "Bearer access-abc");
                    Json(json!({
                        "id": "10987654321",
                        "email": "Person@Gmail.com",
                        "verified_email": true,
                        "name": "Some Person",
                        "picture": "https://lh3.googleusercontent.com/a/photo"
                    }))
                }),
            );
        let base = spawn_stub(router).await;
        let provider = provider_for(&base, Duration::from_secs(5));

        let token = provider.exchange_code("good-code").await.unwrap();
        assert_eq!(token.access_token, "access-abc");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh-def"));

        let info = provider.fetch_profile(&token).await.unwrap();
        assert_eq!(info.provider_user_id, "10987654321");
        assert_eq!(info.email, "person@gmail.com");
        assert!(info.email_verified);
        assert_eq!(info.name, "Some Person");
    }

    #[tokio::test]
    async fn test_rejected_code_is_exchange_failure() {
        let router = Router::new().route(
            "/token",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "invalid_grant"})),
                )
            }),
        );
        let base = spawn_stub(router).await;
        let provider = provider_for(&base, Duration::from_secs(5));

        let result = provider.exchange_code("expired-code").await;
        assert!(matches!(result, Err(ProviderError::CodeExchange(_))));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let router = Router::new().route(
            "/token",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"access_token": "late"}))
            }),
        );
        let base = spawn_stub(router).await;
        let provider = provider_for(&base, Duration::from_millis(200));

        let result = provider.exchange_code("any").await;
        assert!(matches!(result, Err(ProviderError::CodeExchange(_))));
    }

    #[tokio::test]
    async fn test_userinfo_error_status() {
        let router = Router::new().route("/userinfo", get(|| async { StatusCode::UNAUTHORIZED }));
        let base = spawn_stub(router).await;
        let provider = provider_for(&base, Duration::from_secs(5));

        let token = ProviderToken {
            access_token: "revoked".to_string(),
            refresh_token: None,
            expires_in: None,
            token_type: None,
        };
        let result = provider.fetch_profile(&token).await;
        assert!(matches!(result, Err(ProviderError::UserInfo(_))));
    }

    #[tokio::test]
    async fn test_userinfo_without_email() {
        let router = Router::new().route(
            "/userinfo",
            get(|| async { Json(json!({"id": "42", "verified_email": false})) }),
        );
        let base = spawn_stub(router).await;
        let provider = provider_for(&base, Duration::from_secs(5));

        let token = ProviderToken {
            access_token: "ok".to_string(),
            refresh_token: None,
            expires_in: None,
            token_type: None,
        };
        let info = provider.fetch_profile(&token).await.unwrap();
        assert_eq!(info.email, "");
        assert!(!info.email_verified);
    }
}
