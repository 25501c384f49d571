//! Avatar upload and removal

use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::models::AvatarResponse;
use super::storage::{AvatarStorage, StorageError};
use crate::common::config::UploadConfig;
use crate::common::ApiError;
use crate::users::{StoreError, User, UserRepository};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("user not found")]
    UserNotFound,

    #[error("no avatar to delete")]
    NoAvatar,

    #[error("file exceeds {max_size} bytes")]
    FileTooLarge { max_size: usize },

    #[error("invalid file type")]
    InvalidFileType { allowed: Vec<String> },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ProfileError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ProfileError::UserNotFound,
            other => ProfileError::Store(other),
        }
    }
}

impl From<sqlx::Error> for ProfileError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::from(err).into()
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::UserNotFound => {
                ApiError::NotFound("user_not_found", "User not found".into())
            }
            ProfileError::NoAvatar => ApiError::BadRequest("no_avatar", "No avatar to delete".into()),
            ProfileError::FileTooLarge { max_size } => ApiError::BadRequest(
                "file_too_large",
                format!(
                    "File size exceeds the maximum allowed size ({} bytes)",
                    max_size
                ),
            ),
            ProfileError::InvalidFileType { allowed } => ApiError::BadRequest(
                "invalid_file_type",
                format!("Only {} files are allowed", allowed.join(", ")),
            ),
            ProfileError::Storage(e) => ApiError::InternalServer(e.to_string()),
            ProfileError::Store(e) => e.into(),
        }
    }
}

/// Lowercase extension of `filename`, without the dot
fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub struct ProfileService {
    db: SqlitePool,
    storage: Arc<dyn AvatarStorage>,
    upload: UploadConfig,
}

impl ProfileService {
    pub fn new(db: SqlitePool, storage: Arc<dyn AvatarStorage>, upload: UploadConfig) -> Self {
        Self {
            db,
            storage,
            upload,
        }
    }

    fn invalid_type(&self) -> ProfileError {
        ProfileError::InvalidFileType {
            allowed: self.upload.allowed_types.clone(),
        }
    }

    /// Checks size, extension and sniffed content; returns the extension to store under.
    fn check_upload(&self, filename: &str, data: &[u8]) -> Result<String, ProfileError> {
        if data.len() > self.upload.max_size {
            return Err(ProfileError::FileTooLarge {
                max_size: self.upload.max_size,
            });
        }

        let ext = extension_of(filename)
            .filter(|ext| self.upload.allowed_types.iter().any(|allowed| allowed == ext))
            .ok_or_else(|| self.invalid_type())?;

        if !infer::is_image(data) {
            return Err(self.invalid_type());
        }

        Ok(ext)
    }

    async fn load_user(&self, user_id: &str) -> Result<User, ProfileError> {
        let mut conn = self.db.acquire().await?;
        Ok(UserRepository::find_by_id(&mut conn, user_id).await?)
    }

    pub async fn upload_avatar(
        &self,
        user_id: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<AvatarResponse, ProfileError> {
        let ext = self.check_upload(filename, data)?;
        let previous = self.load_user(user_id).await?.avatar_url;

        let stored_name = format!("{}.{}", Uuid::new_v4(), ext);
        let avatar_url = self.storage.save(&stored_name, data).await?;

        let update = {
            let mut conn = self.db.acquire().await?;
            UserRepository::set_avatar_url(&mut conn, user_id, Some(&avatar_url)).await
        };

        if let Err(e) = update {
            error!(user_id = %user_id, error = %e, "Failed to record new avatar, removing file");
            if let Err(cleanup) = self.storage.remove(&avatar_url).await {
                warn!(error = %cleanup, url = %avatar_url, "Failed to remove orphaned avatar file");
            }
            return Err(e.into());
        }

        if let Some(previous) = previous.filter(|url| !url.is_empty()) {
            if let Err(e) = self.storage.remove(&previous).await {
                warn!(user_id = %user_id, error = %e, "Failed to remove previous avatar");
            }
        }

        info!(user_id = %user_id, avatar_url = %avatar_url, "Avatar uploaded");

        Ok(AvatarResponse { avatar_url })
    }

    pub async fn delete_avatar(&self, user_id: &str) -> Result<(), ProfileError> {
        let current = match self.load_user(user_id).await?.avatar_url {
            Some(url) if !url.is_empty() => url,
            _ => return Err(ProfileError::NoAvatar),
        };

        {
            let mut conn = self.db.acquire().await?;
            UserRepository::set_avatar_url(&mut conn, user_id, None).await?;
        }

        if let Err(e) = self.storage.remove(&current).await {
            warn!(user_id = %user_id, error = %e, "Failed to remove avatar file");
        }

        info!(user_id = %user_id, "Avatar removed");

        Ok(())
    }
}
