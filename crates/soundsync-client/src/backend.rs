//! Generation pipeline trigger.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use soundsync_models::{GenerationId, TokenSource};
use tracing::{info, warn};

use crate::error::{ClientError, ClientResult};

/// Body of a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    pub generation_id: GenerationId,
    pub user_id: String,
    pub storage_path: String,
}

/// Starts the external "video to music" pipeline.
#[async_trait]
pub trait GenerationTrigger: Send + Sync {
    async fn trigger(&self, request: &TriggerRequest) -> ClientResult<()>;
}

/// HTTP trigger posting to `{api_url}/video-to-music/`.
#[derive(Clone)]
pub struct HttpGenerationTrigger {
    http: Client,
    api_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl HttpGenerationTrigger {
    pub fn new(http: Client, api_url: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/video-to-music/", self.api_url)
    }
}

#[async_trait]
impl GenerationTrigger for HttpGenerationTrigger {
    async fn trigger(&self, request: &TriggerRequest) -> ClientResult<()> {
        let mut builder = self.http.post(self.endpoint()).json(request);
        match self.tokens.access_token().await {
            Ok(token) => builder = builder.bearer_auth(token),
            Err(e) => warn!("Triggering generation without a token: {}", e),
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::trigger(format!("status {}: {}", status, body)));
        }

        info!(generation_id = %request.generation_id, "Generation triggered");
        Ok(())
    }
}
