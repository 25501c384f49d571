//! Tests for profile module
//!
//! These tests verify avatar handling:
//! - Size, extension and content checks
//! - Replacing and deleting stored files
//! - Cleanup when the database update fails

#[cfg(test)]
mod tests {
    use super::super::storage::StorageError;
    use super::super::*;
    use crate::common::config::UploadConfig;
    use crate::common::testing::{insert_user, new_user, test_pool};
    use crate::common::ApiError;
    use crate::users::{UserRepository, UserStatus};
    use async_trait::async_trait;
    use sqlx::SqlitePool;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    const PNG: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52,
    ];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00];

    fn upload_config(root: &Path) -> UploadConfig {
        UploadConfig {
            path: root.to_path_buf(),
            ..Default::default()
        }
    }

    fn service_for(pool: &SqlitePool, root: &Path) -> ProfileService {
        ProfileService::new(
            pool.clone(),
            Arc::new(LocalAvatarStorage::new(root)),
            upload_config(root),
        )
    }

    fn stored_files(root: &Path) -> usize {
        std::fs::read_dir(root).map(|d| d.count()).unwrap_or(0)
    }

    async fn avatar_of(pool: &SqlitePool, user_id: &str) -> Option<String> {
        let mut conn = pool.acquire().await.unwrap();
        UserRepository::find_by_id(&mut conn, user_id)
            .await
            .unwrap()
            .avatar_url
    }

    #[tokio::test]
    async fn test_upload_stores_file_and_updates_user() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let service = service_for(&pool, dir.path());
        let user = insert_user(&pool, new_user("avatar@example.com")).await;

        let response = service
            .upload_avatar(&user.id, "Me.PNG", PNG)
            .await
            .unwrap();

        assert!(response.avatar_url.starts_with("/uploads/avatars/"));
        assert!(response.avatar_url.ends_with(".png"));
        let filename = response.avatar_url.rsplit('/').next().unwrap();
        assert_eq!(std::fs::read(dir.path().join(filename)).unwrap(), PNG);
        assert_eq!(avatar_of(&pool, &user.id).await, Some(response.avatar_url));
    }

    #[tokio::test]
    async fn test_replacing_avatar_removes_previous_file() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let service = service_for(&pool, dir.path());
        let user = insert_user(&pool, new_user("swap@example.com")).await;

        let first = service.upload_avatar(&user.id, "a.png", PNG).await.unwrap();
        let second = service.upload_avatar(&user.id, "b.jpg", JPEG).await.unwrap();

        assert_ne!(first.avatar_url, second.avatar_url);
        assert_eq!(stored_files(dir.path()), 1);
        assert_eq!(avatar_of(&pool, &user.id).await, Some(second.avatar_url));
    }

    #[tokio::test]
    async fn test_provider_avatar_is_replaced_without_touching_disk() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let service = service_for(&pool, dir.path());
        let mut oauth_user = new_user("oauth@example.com");
        oauth_user.avatar_url = Some("https://lh3.googleusercontent.com/a/pic".to_string());
        let user = insert_user(&pool, oauth_user).await;

        let response = service.upload_avatar(&user.id, "a.webp", PNG).await;
        // PNG bytes under a .webp name are still an image
        assert!(response.is_ok());
        assert_eq!(stored_files(dir.path()), 1);
    }

    #[tokio::test]
    async fn test_file_too_large() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let service = ProfileService::new(
            pool.clone(),
            Arc::new(LocalAvatarStorage::new(dir.path())),
            UploadConfig {
                max_size: 8,
                ..upload_config(dir.path())
            },
        );
        let user = insert_user(&pool, new_user("big@example.com")).await;

        let err = service.upload_avatar(&user.id, "a.png", PNG).await.unwrap_err();
        assert!(matches!(err, ProfileError::FileTooLarge { max_size: 8 }));
        assert_eq!(ApiError::from(err).code(), "file_too_large");
        assert_eq!(stored_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_rejects_disallowed_extension_and_non_images() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let service = service_for(&pool, dir.path());
        let user = insert_user(&pool, new_user("type@example.com")).await;

        for (name, data) in [
            ("anim.gif", PNG),
            ("noext", PNG),
            ("script.png", b"#!/bin/sh\necho hi\n".as_slice()),
        ] {
            let err = service.upload_avatar(&user.id, name, data).await.unwrap_err();
            assert!(
                matches!(err, ProfileError::InvalidFileType { .. }),
                "{} should be rejected",
                name
            );
        }

        assert_eq!(stored_files(dir.path()), 0);
        assert_eq!(avatar_of(&pool, &user.id).await, None);
    }

    #[tokio::test]
    async fn test_upload_for_missing_user() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let service = service_for(&pool, dir.path());

        let err = service
            .upload_avatar("U_MISSING000", "a.png", PNG)
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileError::UserNotFound));
        assert_eq!(stored_files(dir.path()), 0);
    }

    /// Runs `on_save` against the owner's row right after a file is written,
    /// and records the stored avatar URL each time a file is removed.
    struct HookedStorage {
        inner: LocalAvatarStorage,
        pool: SqlitePool,
        user_id: String,
        on_save: &'static str,
        avatar_at_remove: Mutex<Vec<Option<String>>>,
    }

    impl HookedStorage {
        fn new(root: &Path, pool: &SqlitePool, user_id: &str, on_save: &'static str) -> Self {
            Self {
                inner: LocalAvatarStorage::new(root),
                pool: pool.clone(),
                user_id: user_id.to_string(),
                on_save,
                avatar_at_remove: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AvatarStorage for HookedStorage {
        async fn save(&self, filename: &str, data: &[u8]) -> Result<String, StorageError> {
            let url = self.inner.save(filename, data).await?;
            sqlx::query(self.on_save)
                .bind(&self.user_id)
                .execute(&self.pool)
                .await
                .unwrap();
            Ok(url)
        }

        async fn remove(&self, url: &str) -> Result<(), StorageError> {
            let avatar = sqlx::query_scalar::<_, Option<String>>(
                "SELECT avatar_url FROM users WHERE id = ?",
            )
            .bind(&self.user_id)
            .fetch_one(&self.pool)
            .await
            .unwrap();
            self.avatar_at_remove.lock().unwrap().push(avatar);
            self.inner.remove(url).await
        }
    }

    fn hooked_service(
        pool: &SqlitePool,
        root: &Path,
        storage: Arc<HookedStorage>,
    ) -> ProfileService {
        ProfileService::new(pool.clone(), storage, upload_config(root))
    }

    #[tokio::test]
    async fn test_new_file_removed_when_update_fails() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let user = insert_user(&pool, new_user("vanish@example.com")).await;

        let storage = Arc::new(HookedStorage::new(
            dir.path(),
            &pool,
            &user.id,
            "UPDATE users SET deleted_at = 'now' WHERE id = ?",
        ));
        let service = hooked_service(&pool, dir.path(), storage);

        let err = service.upload_avatar(&user.id, "a.png", PNG).await.unwrap_err();
        assert!(matches!(err, ProfileError::UserNotFound));
        assert_eq!(stored_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_upload_keeps_ban_applied_mid_request() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let user = insert_user(&pool, new_user("banned-mid@example.com")).await;

        let storage = Arc::new(HookedStorage::new(
            dir.path(),
            &pool,
            &user.id,
            "UPDATE users SET status = 'banned', role = 'user' WHERE id = ?",
        ));
        let service = hooked_service(&pool, dir.path(), storage);

        let response = service.upload_avatar(&user.id, "a.png", PNG).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let stored = UserRepository::find_by_id(&mut conn, &user.id).await.unwrap();
        assert_eq!(stored.status, UserStatus::Banned);
        assert_eq!(stored.avatar_url.as_deref(), Some(response.avatar_url.as_str()));
    }

    #[tokio::test]
    async fn test_delete_clears_column_before_removing_file() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let user = insert_user(&pool, new_user("order@example.com")).await;

        // The save hook is a no-op write
        let storage = Arc::new(HookedStorage::new(
            dir.path(),
            &pool,
            &user.id,
            "UPDATE users SET updated_at = updated_at WHERE id = ?",
        ));
        let service = hooked_service(&pool, dir.path(), storage.clone());

        service.upload_avatar(&user.id, "a.png", PNG).await.unwrap();
        service.delete_avatar(&user.id).await.unwrap();

        assert_eq!(*storage.avatar_at_remove.lock().unwrap(), vec![None]);
        assert_eq!(stored_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_delete_avatar() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let service = service_for(&pool, dir.path());
        let user = insert_user(&pool, new_user("del@example.com")).await;

        service.upload_avatar(&user.id, "a.png", PNG).await.unwrap();
        service.delete_avatar(&user.id).await.unwrap();

        assert_eq!(stored_files(dir.path()), 0);
        assert_eq!(avatar_of(&pool, &user.id).await, None);

        let err = service.delete_avatar(&user.id).await.unwrap_err();
        assert!(matches!(err, ProfileError::NoAvatar));
        assert_eq!(ApiError::from(err).code(), "no_avatar");
    }
}
