//! SoundSync client core.
//!
//! This crate provides:
//! - Session state with observers, token refresh and route guarding
//! - Email/password and Google sign-in against Identity Toolkit
//! - Live status subscriptions for a single generation
//! - The project list view model and download resolution
//! - The upload-then-generate flow

pub mod app;
pub mod backend;
pub mod config;
pub mod download;
pub mod error;
pub mod guard;
pub mod identity;
pub mod live_status;
pub mod projects;
pub mod session;
pub mod upload;

pub use app::SoundSyncApp;
pub use backend::{GenerationTrigger, HttpGenerationTrigger, TriggerRequest};
pub use config::ClientConfig;
pub use download::{card_file_name, sanitize_file_name, DownloadResolver, DownloadSink, FileSink, FALLBACK_FILE_NAME};
pub use error::{AuthError, ClientError, ClientResult, DownloadError};
pub use guard::{GuardDecision, Route, SessionGuard, SIGN_IN_ROUTE};
pub use identity::{IdentityClient, SignInForm, SignUpForm, GOOGLE_PROVIDER};
pub use live_status::{
    FirestoreRecordWatcher, LiveStatus, LiveStatusSubscriber, RecordStream, RecordWatcher, StatusSeed,
};
pub use projects::{FirestoreGenerationSource, GenerationSource, ProjectList};
pub use session::{AuthObserver, AuthState, RefreshedToken, Session, SessionContext, TokenRefresher};
pub use upload::{UploadFlow, UploadOutcome};
