//! Avatar blob storage

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs as tokio_fs;
use tracing::{debug, warn};

/// Public URL prefix under which locally stored avatars are served
pub const AVATAR_URL_PREFIX: &str = "/uploads/avatars";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait AvatarStorage: Send + Sync {
    /// Stores `data` under `filename` and returns its public URL.
    async fn save(&self, filename: &str, data: &[u8]) -> Result<String, StorageError>;

    /// Removes the blob behind a URL previously returned by `save`.
    ///
    /// URLs this storage does not own (e.g. a provider profile picture) are
    /// ignored, as are files that no longer exist.
    async fn remove(&self, url: &str) -> Result<(), StorageError>;
}

/// Writes avatars into a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalAvatarStorage {
    root: PathBuf,
    url_prefix: String,
}

impl LocalAvatarStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            url_prefix: AVATAR_URL_PREFIX.to_string(),
        }
    }

    fn path_for(&self, filename: &str) -> Result<PathBuf, StorageError> {
        let valid = !filename.is_empty()
            && filename
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
            && !filename.starts_with('.');

        if !valid {
            return Err(StorageError::InvalidName(filename.to_string()));
        }

        Ok(self.root.join(filename))
    }

    fn filename_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(&self.url_prefix)?.strip_prefix('/')
    }
}

#[async_trait]
impl AvatarStorage for LocalAvatarStorage {
    async fn save(&self, filename: &str, data: &[u8]) -> Result<String, StorageError> {
        let path = self.path_for(filename)?;

        tokio_fs::create_dir_all(&self.root).await?;
        tokio_fs::write(&path, data).await?;

        debug!(path = %path.display(), bytes = data.len(), "Avatar file written");

        Ok(format!("{}/{}", self.url_prefix, filename))
    }

    async fn remove(&self, url: &str) -> Result<(), StorageError> {
        let Some(filename) = self.filename_from_url(url) else {
            debug!(url = %url, "Not a locally stored avatar, nothing to remove");
            return Ok(());
        };

        let path = self.path_for(filename)?;

        match tokio_fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "Avatar file already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
