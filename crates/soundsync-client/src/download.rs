//! Download resolver.
//!
//! Absent paths fail fast with [`DownloadError::NotReady`] without touching
//! the network. Everything that can go wrong after that (resolution, fetch,
//! write) collapses into [`DownloadError::Unavailable`]; the cause is only
//! logged. A failed download leaves nothing behind in the download directory.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use soundsync_models::last_path_segment;
use soundsync_storage::BlobStore;
use tracing::{info, warn};

use crate::error::DownloadError;

/// Name used for card downloads whose path has no usable segment.
pub const FALLBACK_FILE_NAME: &str = "download";

/// Receives downloaded bytes.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Persist `bytes` under `file_name`, returning where they landed.
    async fn save(&self, file_name: &str, bytes: Vec<u8>) -> std::io::Result<PathBuf>;
}

/// Writes downloads into a directory, atomically.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DownloadSink for FileSink {
    async fn save(&self, file_name: &str, bytes: Vec<u8>) -> std::io::Result<PathBuf> {
        let dir = self.dir.clone();
        let target = dir.join(sanitize_file_name(file_name));

        tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&dir)?;
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(target)
        })
        .await
        .map_err(std::io::Error::other)?
    }
}

/// Strip anything that would escape the download directory.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// File name for a list-card download: the last path segment.
pub fn card_file_name(path: Option<&str>) -> String {
    path.and_then(last_path_segment)
        .unwrap_or(FALLBACK_FILE_NAME)
        .to_string()
}

/// Resolves storage paths and hands the bytes to a sink.
#[derive(Clone)]
pub struct DownloadResolver {
    store: Arc<dyn BlobStore>,
    http: Client,
    sink: Arc<dyn DownloadSink>,
}

impl DownloadResolver {
    pub fn new(store: Arc<dyn BlobStore>, http: Client, sink: Arc<dyn DownloadSink>) -> Self {
        Self { store, http, sink }
    }

    /// Resolve a path to its retrieval URL without fetching it.
    pub async fn resolve_url(&self, path: Option<&str>) -> Result<String, DownloadError> {
        let path = path.filter(|p| !p.is_empty()).ok_or(DownloadError::NotReady)?;
        self.store.download_url(path).await.map_err(|e| {
            warn!(path = %path, "Download URL resolution failed: {}", e);
            DownloadError::Unavailable
        })
    }

    /// Download the artifact at `path` as `file_name`.
    pub async fn download(&self, path: Option<&str>, file_name: &str) -> Result<PathBuf, DownloadError> {
        let url = self.resolve_url(path).await?;

        let bytes = self.fetch(&url).await.map_err(|e| {
            warn!(path = ?path, "Download fetch failed: {}", e);
            DownloadError::Unavailable
        })?;

        let saved = self.sink.save(file_name, bytes).await.map_err(|e| {
            warn!(file_name = %file_name, "Saving download failed: {}", e);
            DownloadError::Unavailable
        })?;

        info!(path = ?path, saved = %saved.display(), "Downloaded artifact");
        Ok(saved)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, reqwest::Error> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundsync_storage::{StorageError, StorageResult};
    use std::sync::atomic::{AtomicU32, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FakeStore {
        url: Option<String>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl BlobStore for FakeStore {
        async fn download_url(&self, path: &str) -> StorageResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.url
                .clone()
                .ok_or_else(|| StorageError::not_found(path))
        }

        async fn upload_file(&self, _local: &Path, _path: &str, _content_type: &str) -> StorageResult<()> {
            Ok(())
        }
    }

    fn resolver(url: Option<String>, dir: &Path) -> (DownloadResolver, Arc<FakeStore>) {
        let store = Arc::new(FakeStore {
            url,
            calls: AtomicU32::new(0),
        });
        let resolver = DownloadResolver::new(store.clone(), Client::new(), Arc::new(FileSink::new(dir)));
        (resolver, store)
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).map(|mut d| d.next().is_none()).unwrap_or(true)
    }

    #[tokio::test]
    async fn test_absent_path_is_not_ready_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let (resolver, store) = resolver(Some("http://unused".into()), dir.path());

        assert_eq!(resolver.download(None, "track.mp3").await, Err(DownloadError::NotReady));
        assert_eq!(resolver.download(Some(""), "track.mp3").await, Err(DownloadError::NotReady));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_resolution_failure_is_generic() {
        let dir = tempfile::tempdir().unwrap();
        let (resolver, store) = resolver(None, dir.path());

        let err = resolver.download(Some("u1/g1/track.mp3"), "x.mp3").await.unwrap_err();
        assert_eq!(err, DownloadError::Unavailable);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (resolver, _) = resolver(Some(format!("{}/file", server.uri())), dir.path());

        let err = resolver.download(Some("u1/g1/track.mp3"), "x.mp3").await.unwrap_err();
        assert_eq!(err, DownloadError::Unavailable);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_successful_download_is_written() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/track.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3 audio".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (resolver, _) = resolver(Some(format!("{}/media/track.mp3", server.uri())), dir.path());

        let saved = resolver.download(Some("u1/g1/track.mp3"), "Beach.mp3").await.unwrap();
        assert_eq!(saved, dir.path().join("Beach.mp3"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"ID3 audio");

        // Idempotent: a second download replaces the file
        let again = resolver.download(Some("u1/g1/track.mp3"), "Beach.mp3").await.unwrap();
        assert_eq!(again, saved);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_file_name_helpers() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_file_name("  "), "download");
        assert_eq!(card_file_name(Some("u1/g1/track.mp3")), "track.mp3");
        assert_eq!(card_file_name(None), "download");
    }
}
