//! Shared data models for the SoundSync client.
//!
//! This crate provides Serde-serializable types for:
//! - Generation records and their artifacts
//! - The project view model and its mapper
//! - Generation status tracking
//! - Project filtering
//! - User profiles and upload media types
//! - The bearer token source used by the store clients

pub mod error;
pub mod filter;
pub mod generation;
pub mod media;
pub mod project;
pub mod status;
pub mod token;
pub mod user;

// Re-export common types
pub use error::{ModelError, ModelResult};
pub use filter::{project_count_label, ProjectFilter, ALL_GENRES};
pub use generation::{
    generation_storage_prefix, ArtifactKind, Generation, GenerationId, GenerationRecord,
    TrackArtifact, VideoArtifact,
};
pub use media::{MediaKind, MediaType, UNSUPPORTED_MEDIA_MESSAGE};
pub use project::{
    card_download_path, is_valid_date_format, last_path_segment, suggested_file_name, DisplayOptions,
    ProjectView,
};
pub use status::{GenerationStatus, StatusChange, StatusTracker};
pub use token::{StaticToken, TokenError, TokenSource};
pub use user::{default_display_name, UserProfile, UserStats};
