//! Authentication request and response models

use serde::{Deserialize, Serialize};

use crate::users::UserResponse;

pub use super::tokens::Claims;

#[derive(Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `phone`/`address` are only touched when present
#[derive(Deserialize, Debug, Clone)]
pub struct UpdateProfileRequest {
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Token envelope returned by every successful authentication
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

impl AuthResponse {
    pub fn bearer(access_token: String, expires_in: i64, user: UserResponse) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            user,
        }
    }
}
