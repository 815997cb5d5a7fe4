//! Blob store abstraction and backend selection.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use soundsync_models::TokenSource;
use tracing::info;

use crate::error::{StorageError, StorageResult};
use crate::firebase::{FirebaseStorageClient, FirebaseStorageConfig};
use crate::s3::S3Client;

/// Resolves logical storage paths and accepts uploads.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Resolve a logical path to a short-lived retrieval URL.
    async fn download_url(&self, path: &str) -> StorageResult<String>;

    /// Upload a local file to a logical path.
    async fn upload_file(&self, local: &Path, path: &str, content_type: &str) -> StorageResult<()>;
}

/// Which blob store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Firebase,
    S3,
}

impl FromStr for StorageBackend {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "firebase" | "gcs" => Ok(Self::Firebase),
            "s3" | "r2" => Ok(Self::S3),
            other => Err(StorageError::config(format!("Unknown STORAGE_BACKEND: {}", other))),
        }
    }
}

impl StorageBackend {
    /// Read `STORAGE_BACKEND`, defaulting to Firebase.
    pub fn from_env() -> StorageResult<Self> {
        std::env::var("STORAGE_BACKEND")
            .map(|v| v.parse())
            .unwrap_or(Ok(Self::Firebase))
    }
}

/// Build the configured blob store.
pub fn blob_store_from_env(tokens: Arc<dyn TokenSource>) -> StorageResult<Arc<dyn BlobStore>> {
    let backend = StorageBackend::from_env()?;
    info!(backend = ?backend, "Configuring blob store");

    let store: Arc<dyn BlobStore> = match backend {
        StorageBackend::Firebase => Arc::new(FirebaseStorageClient::new(FirebaseStorageConfig::from_env()?, tokens)?),
        StorageBackend::S3 => Arc::new(S3Client::from_env()?),
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("firebase".parse::<StorageBackend>().unwrap(), StorageBackend::Firebase);
        assert_eq!("S3".parse::<StorageBackend>().unwrap(), StorageBackend::S3);
        assert!("ftp".parse::<StorageBackend>().is_err());
    }

    #[test]
    #[serial]
    fn test_backend_defaults_to_firebase() {
        std::env::remove_var("STORAGE_BACKEND");
        assert_eq!(StorageBackend::from_env().unwrap(), StorageBackend::Firebase);
    }

    #[test]
    #[serial]
    fn test_firebase_backend_requires_bucket() {
        std::env::remove_var("STORAGE_BACKEND");
        std::env::remove_var("FIREBASE_STORAGE_BUCKET");
        let tokens = Arc::new(soundsync_models::StaticToken("t".into()));
        assert!(matches!(blob_store_from_env(tokens), Err(StorageError::Config(_))));
    }
}
