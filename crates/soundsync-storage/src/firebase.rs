//! Firebase Storage REST client.
//!
//! Download URLs are built the way the web SDK's `getDownloadURL` builds
//! them: read the object metadata, take the first download token, and append
//! it to the `alt=media` URL.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use soundsync_models::TokenSource;
use tracing::{debug, info};

use crate::blob::BlobStore;
use crate::error::{StorageError, StorageResult};

/// Public Firebase Storage endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://firebasestorage.googleapis.com";

/// Configuration for the Firebase Storage client.
#[derive(Debug, Clone)]
pub struct FirebaseStorageConfig {
    /// Bucket name, e.g. "my-app.appspot.com"
    pub bucket: String,
    /// Scheme and host of the REST endpoint
    pub endpoint: String,
    /// Request timeout
    pub timeout: Duration,
}

impl FirebaseStorageConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let bucket = std::env::var("FIREBASE_STORAGE_BUCKET")
            .map_err(|_| StorageError::config("FIREBASE_STORAGE_BUCKET not set"))?;
        let mut config = Self::new(bucket);
        if let Ok(host) = std::env::var("FIREBASE_STORAGE_EMULATOR_HOST") {
            if !host.is_empty() {
                config.endpoint = format!("http://{}", host);
            }
        }
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    #[serde(default)]
    download_tokens: Option<String>,
}

/// Firebase Storage client authorized with the user's ID token.
#[derive(Clone)]
pub struct FirebaseStorageClient {
    http: Client,
    config: FirebaseStorageConfig,
    tokens: Arc<dyn TokenSource>,
}

impl FirebaseStorageClient {
    pub fn new(config: FirebaseStorageConfig, tokens: Arc<dyn TokenSource>) -> StorageResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("soundsync-storage/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config, tokens })
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/v0/b/{}/o/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.bucket,
            urlencoding::encode(path)
        )
    }

    fn auth_header(token: &str) -> String {
        format!("Firebase {}", token)
    }
}

#[async_trait]
impl BlobStore for FirebaseStorageClient {
    async fn download_url(&self, path: &str) -> StorageResult<String> {
        let path = StorageError::check_path(path)?;

        let url = self.object_url(path);
        let token = self.tokens.access_token().await?;
        debug!(path = %path, "Resolving download URL");

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, Self::auth_header(&token))
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::from_http_status(status, path, body));
        }

        let metadata: ObjectMetadata = response.json().await?;
        let download_token = metadata
            .download_tokens
            .as_deref()
            .and_then(|t| t.split(',').map(str::trim).find(|t| !t.is_empty()))
            .ok_or_else(|| StorageError::resolve(format!("{} has no download token", path)))?;

        Ok(format!(
            "{}?alt=media&token={}",
            url,
            urlencoding::encode(download_token)
        ))
    }

    async fn upload_file(&self, local: &Path, path: &str, content_type: &str) -> StorageResult<()> {
        debug!("Uploading {} to {}", local.display(), path);

        let data = tokio::fs::read(local)
            .await
            .map_err(|e| StorageError::upload(format!("reading {}: {}", local.display(), e)))?;
        let url = format!(
            "{}/v0/b/{}/o?name={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.bucket,
            urlencoding::encode(path)
        );
        let token = self.tokens.access_token().await?;

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, Self::auth_header(&token))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| StorageError::upload(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::upload(format!("status {}: {}", status, body)));
        }

        info!("Uploaded {} to {}", local.display(), path);
        Ok(())
    }
}
