//! Application wiring.
//!
//! `SoundSyncApp` builds every collaborator from the environment around a
//! single [`SessionContext`] and exposes the auth flows with user profile
//! bootstrap.

use std::sync::Arc;

use reqwest::Client;
use soundsync_firestore::{FirestoreClient, FirestoreConfig, GenerationRepository, UserRepository};
use soundsync_models::{TokenSource, UserProfile};
use soundsync_storage::{blob_store_from_env, BlobStore};
use tracing::{info, warn};

use crate::backend::HttpGenerationTrigger;
use crate::config::ClientConfig;
use crate::download::{DownloadResolver, FileSink};
use crate::error::{AuthError, ClientError, ClientResult};
use crate::identity::{IdentityClient, SignInForm, SignUpForm, GOOGLE_PROVIDER};
use crate::live_status::{FirestoreRecordWatcher, LiveStatusSubscriber};
use crate::projects::{FirestoreGenerationSource, ProjectList};
use crate::session::{Session, SessionContext};
use crate::upload::UploadFlow;

/// Fully wired client.
#[derive(Clone)]
pub struct SoundSyncApp {
    config: ClientConfig,
    session: SessionContext,
    identity: IdentityClient,
    firestore: FirestoreClient,
    store: Arc<dyn BlobStore>,
    http: Client,
}

impl SoundSyncApp {
    /// Build from explicit parts.
    pub fn new(
        config: ClientConfig,
        firestore_config: FirestoreConfig,
        store_factory: impl FnOnce(Arc<dyn TokenSource>) -> ClientResult<Arc<dyn BlobStore>>,
    ) -> ClientResult<Self> {
        let identity = IdentityClient::new(&config)?;
        let session = SessionContext::with_refresher(Arc::new(identity.clone()));
        let tokens: Arc<dyn TokenSource> = Arc::new(session.clone());

        let firestore = FirestoreClient::new(firestore_config, tokens.clone())?;
        let store = store_factory(tokens)?;
        let http = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            config,
            session,
            identity,
            firestore,
            store,
            http,
        })
    }

    /// Build from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        let config = ClientConfig::from_env()?;
        let firestore_config = FirestoreConfig::from_env()?;
        Self::new(config, firestore_config, |tokens| Ok(blob_store_from_env(tokens)?))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    // =========================================================================
    // Auth flows
    // =========================================================================

    /// Adopt a previously persisted session, or resolve to signed out.
    pub fn restore(&self, session: Option<Session>) {
        match session {
            Some(session) => self.session.set_signed_in(session),
            None => self.session.set_signed_out(),
        }
    }

    pub async fn sign_in(&self, form: &SignInForm) -> Result<Session, AuthError> {
        let result = self.identity.sign_in_with_password(form).await;
        self.complete_sign_in(result).await
    }

    pub async fn sign_up(&self, form: &SignUpForm) -> Result<Session, AuthError> {
        let result = self.identity.sign_up(form).await;
        self.complete_sign_in(result).await
    }

    /// Sign in with a Google ID token obtained out of band.
    pub async fn sign_in_with_google(&self, id_token: &str) -> Result<Session, AuthError> {
        let result = self.identity.sign_in_with_idp(GOOGLE_PROVIDER, id_token).await;
        self.complete_sign_in(result).await
    }

    pub fn sign_out(&self) {
        self.session.set_signed_out();
    }

    async fn complete_sign_in(&self, result: Result<Session, AuthError>) -> Result<Session, AuthError> {
        let session = match result {
            Ok(session) => session,
            Err(e) => {
                self.session.set_signed_out();
                return Err(e);
            }
        };

        self.session.set_signed_in(session.clone());
        self.bootstrap_profile(&session).await;
        Ok(session)
    }

    /// Create `users/{uid}` on first sign-in. Failures are logged only.
    async fn bootstrap_profile(&self, session: &Session) {
        let profile = UserProfile::new(&session.uid, session.email.clone(), session.display_name.clone());
        match UserRepository::new(self.firestore.clone()).ensure_user_doc(&profile).await {
            Ok(true) => info!(uid = %session.uid, "User profile created"),
            Ok(false) => {}
            Err(e) => warn!(uid = %session.uid, "Failed to ensure user profile: {}", e),
        }
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Uid of the signed-in user.
    pub fn require_uid(&self) -> ClientResult<String> {
        self.session.current_uid().ok_or(ClientError::NotSignedIn)
    }

    pub fn generations(&self, uid: &str) -> GenerationRepository {
        GenerationRepository::new(self.firestore.clone(), uid)
    }

    pub fn project_list(&self) -> ProjectList<FirestoreGenerationSource> {
        ProjectList::new(
            FirestoreGenerationSource::new(self.firestore.clone()),
            self.config.display.clone(),
        )
    }

    pub fn live_status(&self) -> LiveStatusSubscriber {
        let watcher = FirestoreRecordWatcher::new(self.firestore.clone(), self.config.poll_interval);
        LiveStatusSubscriber::new(self.session.clone(), Arc::new(watcher), self.config.display.clone())
    }

    pub fn downloader(&self) -> DownloadResolver {
        DownloadResolver::new(
            self.store.clone(),
            self.http.clone(),
            Arc::new(FileSink::new(self.config.download_dir.clone())),
        )
    }

    pub fn upload_flow(&self) -> UploadFlow {
        let trigger = HttpGenerationTrigger::new(
            self.http.clone(),
            self.config.api_url.clone(),
            Arc::new(self.session.clone()),
        );
        UploadFlow::new(self.store.clone(), self.firestore.clone(), Arc::new(trigger))
    }
}
