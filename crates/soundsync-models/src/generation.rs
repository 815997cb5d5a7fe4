//! Generation record models.
//!
//! A generation is one "video to soundtrack" job stored at
//! `users/{uid}/generations/{genId}`. The external pipeline writes artifact
//! paths and ready flags into it; the client only reads it (plus title edits).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a generation record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationId(pub String);

impl GenerationId {
    /// Generate a new random generation ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for GenerationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for GenerationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GenerationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Which artifact of a generation a path or download refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Generated audio track
    Track,
    /// Uploaded source video
    NormalVideo,
    /// Source video muxed with the generated track
    AiVideo,
}

impl ArtifactKind {
    /// Field name of the sub-record in the stored document.
    pub fn field_name(&self) -> &'static str {
        match self {
            ArtifactKind::Track => "track",
            ArtifactKind::NormalVideo => "normal_video",
            ArtifactKind::AiVideo => "ai_video",
        }
    }

    /// File extension used when suggesting a download name.
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Track => "mp3",
            ArtifactKind::NormalVideo | ArtifactKind::AiVideo => "mp4",
        }
    }

    /// Stem used in the suggested download name when the project has no title.
    pub fn fallback_stem(&self) -> &'static str {
        match self {
            ArtifactKind::Track => "track",
            ArtifactKind::NormalVideo | ArtifactKind::AiVideo => "video",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field_name())
    }
}

/// Generated audio track sub-record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackArtifact {
    /// Logical storage path of the audio file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    /// Genre label assigned by the pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Display duration, as written by the pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Whether the storage path is valid and fetchable
    #[serde(default)]
    pub ready: bool,
}

/// Video sub-record (uploaded source or AI muxed output).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoArtifact {
    /// Logical storage path of the video file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    /// Whether the storage path is valid and fetchable
    #[serde(default)]
    pub ready: bool,
}

/// Typed view of a stored generation document.
///
/// Every field is optional because the pipeline fills the record in
/// asynchronously. Nothing past the repository boundary touches raw fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    /// User-editable project title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Generated audio track
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<TrackArtifact>,

    /// Uploaded source video
    #[serde(default, rename = "normal_video", skip_serializing_if = "Option::is_none")]
    pub normal_video: Option<VideoArtifact>,

    /// Source video muxed with the generated track
    #[serde(default, rename = "ai_video", skip_serializing_if = "Option::is_none")]
    pub ai_video: Option<VideoArtifact>,

    /// Thumbnail URL for list views
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    /// Server-assigned creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Server-assigned last update timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl GenerationRecord {
    /// Storage path of an artifact, if the pipeline has written one.
    ///
    /// Empty strings are treated as absent.
    pub fn storage_path(&self, kind: ArtifactKind) -> Option<&str> {
        let path = match kind {
            ArtifactKind::Track => self.track.as_ref().and_then(|t| t.storage_path.as_deref()),
            ArtifactKind::NormalVideo => self
                .normal_video
                .as_ref()
                .and_then(|v| v.storage_path.as_deref()),
            ArtifactKind::AiVideo => self.ai_video.as_ref().and_then(|v| v.storage_path.as_deref()),
        };
        path.filter(|p| !p.is_empty())
    }

    /// Ready flag of an artifact. Absent sub-records are not ready.
    pub fn is_ready(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::Track => self.track.as_ref().map(|t| t.ready).unwrap_or(false),
            ArtifactKind::NormalVideo => self.normal_video.as_ref().map(|v| v.ready).unwrap_or(false),
            ArtifactKind::AiVideo => self.ai_video.as_ref().map(|v| v.ready).unwrap_or(false),
        }
    }

    /// True once either generated output (track or AI video) is ready.
    pub fn has_ready_output(&self) -> bool {
        self.is_ready(ArtifactKind::Track) || self.is_ready(ArtifactKind::AiVideo)
    }

    /// Non-empty title, if any.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.is_empty())
    }
}

/// A generation record together with its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    /// Document ID
    pub id: GenerationId,
    /// Owning user
    pub user_id: String,
    /// Record contents
    pub record: GenerationRecord,
}

impl Generation {
    pub fn new(id: GenerationId, user_id: impl Into<String>, record: GenerationRecord) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            record,
        }
    }
}

/// Logical storage prefix for a generation's files.
pub fn generation_storage_prefix(user_id: &str, id: &GenerationId) -> String {
    format!("users/{}/generations/{}", user_id, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_id_generation() {
        let id1 = GenerationId::new();
        let id2 = GenerationId::new();
        assert_ne!(id1, id2);
        assert!(!id1.as_str().contains('-'));
    }

    #[test]
    fn test_empty_record_has_nothing_ready() {
        let record = GenerationRecord::default();
        assert!(!record.has_ready_output());
        assert_eq!(record.storage_path(ArtifactKind::Track), None);
        assert_eq!(record.title(), None);
    }

    #[test]
    fn test_empty_storage_path_is_absent() {
        let record = GenerationRecord {
            track: Some(TrackArtifact {
                storage_path: Some(String::new()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(record.storage_path(ArtifactKind::Track), None);
    }

    #[test]
    fn test_ai_video_ready_counts_as_output() {
        let record = GenerationRecord {
            ai_video: Some(VideoArtifact {
                storage_path: Some("u1/g1/ai.mp4".into()),
                ready: true,
            }),
            ..Default::default()
        };
        assert!(record.has_ready_output());
        assert!(!record.is_ready(ArtifactKind::Track));
    }

    #[test]
    fn test_normal_video_ready_is_not_output() {
        let record = GenerationRecord {
            normal_video: Some(VideoArtifact {
                storage_path: Some("u1/g1/input.mp4".into()),
                ready: true,
            }),
            ..Default::default()
        };
        assert!(!record.has_ready_output());
    }

    #[test]
    fn test_record_json_field_names() {
        let json = serde_json::json!({
            "title": "Chase",
            "track": { "storagePath": "u1/g1/track.mp3", "ready": true },
            "ai_video": { "storagePath": "u1/g1/ai.mp4" }
        });
        let record: GenerationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.storage_path(ArtifactKind::Track), Some("u1/g1/track.mp3"));
        assert!(!record.is_ready(ArtifactKind::AiVideo));
        assert_eq!(record.title(), Some("Chase"));
    }

    #[test]
    fn test_storage_prefix() {
        let id = GenerationId::from_string("g1");
        assert_eq!(generation_storage_prefix("u1", &id), "users/u1/generations/g1");
    }
}
