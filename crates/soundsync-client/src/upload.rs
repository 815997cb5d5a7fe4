//! Upload flow: validate, upload, create the record, trigger generation.

use std::path::Path;
use std::sync::Arc;

use soundsync_firestore::{FirestoreClient, GenerationRepository};
use soundsync_models::{
    generation_storage_prefix, GenerationId, GenerationRecord, MediaType, VideoArtifact,
};
use soundsync_storage::BlobStore;
use tracing::{info, warn};

use crate::backend::{GenerationTrigger, TriggerRequest};
use crate::error::{ClientError, ClientResult};

/// Result of a started upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub generation_id: GenerationId,
    /// Where the source file was stored
    pub storage_path: String,
    pub media: MediaType,
    /// Whether the pipeline accepted the trigger
    pub triggered: bool,
}

/// Runs the upload-then-generate sequence for one user.
pub struct UploadFlow {
    store: Arc<dyn BlobStore>,
    firestore: FirestoreClient,
    trigger: Arc<dyn GenerationTrigger>,
}

impl UploadFlow {
    pub fn new(store: Arc<dyn BlobStore>, firestore: FirestoreClient, trigger: Arc<dyn GenerationTrigger>) -> Self {
        Self {
            store,
            firestore,
            trigger,
        }
    }

    /// Upload `local` for `uid` and start a generation.
    ///
    /// Unsupported files are rejected before anything is uploaded. A failed
    /// trigger is logged and reported through `triggered`; the record exists
    /// either way.
    pub async fn start(&self, uid: &str, local: &Path, title: Option<&str>) -> ClientResult<UploadOutcome> {
        let media = MediaType::from_path(local)?;

        let file_name = local
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::config(format!("{} has no file name", local.display())))?;
        let generation_id = GenerationId::new();
        let storage_path = format!("{}/{}", generation_storage_prefix(uid, &generation_id), file_name);

        self.store
            .upload_file(local, &storage_path, media.content_type)
            .await?;

        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .or_else(|| local.file_stem().and_then(|s| s.to_str()).map(str::to_string));

        let record = GenerationRecord {
            title,
            normal_video: Some(VideoArtifact {
                storage_path: Some(storage_path.clone()),
                ready: true,
            }),
            ..Default::default()
        };
        GenerationRepository::new(self.firestore.clone(), uid)
            .create(&generation_id, &record)
            .await?;
        info!(uid = %uid, generation_id = %generation_id, "Upload stored");

        let request = TriggerRequest {
            generation_id: generation_id.clone(),
            user_id: uid.to_string(),
            storage_path: storage_path.clone(),
        };
        let triggered = match self.trigger.trigger(&request).await {
            Ok(()) => true,
            Err(e) => {
                warn!(generation_id = %generation_id, "Generation trigger failed: {}", e);
                false
            }
        };

        Ok(UploadOutcome {
            generation_id,
            storage_path,
            media,
            triggered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use soundsync_firestore::{FirestoreConfig, RetryConfig};
    use soundsync_models::{StaticToken, UNSUPPORTED_MEDIA_MESSAGE};
    use soundsync_storage::StorageResult;
    use std::sync::Mutex;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingStore {
        uploads: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl BlobStore for RecordingStore {
        async fn download_url(&self, path: &str) -> StorageResult<String> {
            Ok(format!("https://example.com/{}", path))
        }

        async fn upload_file(&self, _local: &Path, path: &str, content_type: &str) -> StorageResult<()> {
            self.uploads
                .lock()
                .unwrap()
                .push((path.to_string(), content_type.to_string()));
            Ok(())
        }
    }

    struct FixedTrigger {
        ok: bool,
        requests: Mutex<Vec<TriggerRequest>>,
    }

    #[async_trait]
    impl GenerationTrigger for FixedTrigger {
        async fn trigger(&self, request: &TriggerRequest) -> ClientResult<()> {
            self.requests.lock().unwrap().push(request.clone());
            if self.ok {
                Ok(())
            } else {
                Err(ClientError::trigger("down"))
            }
        }
    }

    fn firestore(server: &MockServer) -> FirestoreClient {
        let mut config = FirestoreConfig::new("test-project");
        config.endpoint = server.uri();
        config.timeout = Duration::from_secs(5);
        config.retry = RetryConfig::disabled();
        FirestoreClient::new(config, Arc::new(StaticToken("tok".into()))).unwrap()
    }

    fn flow(server: &MockServer, trigger_ok: bool) -> (UploadFlow, Arc<RecordingStore>, Arc<FixedTrigger>) {
        let store = Arc::new(RecordingStore::default());
        let trigger = Arc::new(FixedTrigger {
            ok: trigger_ok,
            requests: Mutex::new(Vec::new()),
        });
        (
            UploadFlow::new(store.clone(), firestore(server), trigger.clone()),
            store,
            trigger,
        )
    }

    async fn mock_create(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path_regex(r"/documents/users/u1/generations$"))
            .and(body_partial_json(json!({"fields": {"normal_video": {"mapValue": {"fields": {"ready": {"booleanValue": true}}}}}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/test-project/databases/(default)/documents/users/u1/generations/x",
                "fields": {}
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_unsupported_file_is_rejected_before_upload() {
        let server = MockServer::start().await;
        let (flow, store, trigger) = flow(&server, true);

        let err = flow.start("u1", Path::new("notes.txt"), None).await.unwrap_err();
        assert_eq!(err.to_string(), UNSUPPORTED_MEDIA_MESSAGE);
        assert!(store.uploads.lock().unwrap().is_empty());
        assert!(trigger.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_creates_record_and_triggers() {
        let server = MockServer::start().await;
        mock_create(&server).await;
        let (flow, store, trigger) = flow(&server, true);

        let outcome = flow
            .start("u1", Path::new("/videos/beach.MOV"), Some("Beach day"))
            .await
            .unwrap();

        let prefix = format!("users/u1/generations/{}/", outcome.generation_id);
        assert!(outcome.storage_path.starts_with(&prefix));
        assert!(outcome.storage_path.ends_with("beach.MOV"));
        assert!(outcome.triggered);
        assert!(outcome.media.is_video());

        let uploads = store.uploads.lock().unwrap();
        assert_eq!(uploads[0], (outcome.storage_path.clone(), "video/quicktime".to_string()));
        assert_eq!(trigger.requests.lock().unwrap()[0].generation_id, outcome.generation_id);
    }

    #[tokio::test]
    async fn test_failed_trigger_still_returns_generation() {
        let server = MockServer::start().await;
        mock_create(&server).await;
        let (flow, _, _) = flow(&server, false);

        let outcome = flow.start("u1", Path::new("song.mp3"), None).await.unwrap();
        assert!(!outcome.triggered);
    }
}
