// src/profile/models.rs

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar_url: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
