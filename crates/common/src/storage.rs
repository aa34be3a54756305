//! Media storage for uploaded post images.

use std::path::PathBuf;

use crate::{AppError, AppResult, IdGenerator};

/// Stored file metadata.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Storage key (path relative to the media root).
    pub key: String,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store a file under `key`.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<UploadedFile>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url,
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<UploadedFile> {
        let path = self.base_path.join(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

        tracing::debug!(key = %key, size = data.len(), "Stored media file");

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
        })
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

/// Generate a unique storage key under `prefix`, keeping the extension of
/// `original_name` when it has a sane one.
#[must_use]
pub fn generate_storage_key(prefix: &str, original_name: &str) -> String {
    let extension = original_name
        .rfind('.')
        .filter(|&pos| pos > 0 && pos < original_name.len() - 1)
        .map(|pos| original_name[pos + 1..].to_ascii_lowercase())
        .filter(|ext| ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string());

    format!(
        "{}/{}.{}",
        prefix.trim_end_matches('/'),
        IdGenerator::new().generate(),
        extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_storage_key() {
        let key = generate_storage_key("posts", "Photo.JPG");
        assert!(key.starts_with("posts/"));
        assert!(key.ends_with(".jpg"));
    }

    #[test]
    fn test_generate_storage_key_no_extension() {
        let key = generate_storage_key("posts/", "file");
        assert!(key.starts_with("posts/"));
        assert!(!key.starts_with("posts//"));
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn test_generate_storage_key_rejects_odd_extension() {
        let key = generate_storage_key("posts", "evil.p/hp");
        assert!(key.ends_with(".bin"));
    }

    #[tokio::test]
    async fn test_local_storage_round_trip() {
        let root = std::env::temp_dir().join(format!("yatube-media-{}", IdGenerator::new().generate()));
        let storage = LocalStorage::new(root.clone(), "/media/".to_string());

        let stored = storage
            .upload("posts/a.gif", b"GIF89a", "image/gif")
            .await
            .unwrap();
        assert_eq!(stored.url, "/media/posts/a.gif");
        assert_eq!(stored.size, 6);
        assert_eq!(tokio::fs::read(root.join("posts/a.gif")).await.unwrap(), b"GIF89a");

        let _ = tokio::fs::remove_dir_all(root).await;
    }
}
