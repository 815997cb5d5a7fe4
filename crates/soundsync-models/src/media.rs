//! Upload media type detection.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Message shown when a file type is rejected.
pub const UNSUPPORTED_MEDIA_MESSAGE: &str =
    "Please upload a video file (MP4, MOV, AVI) or audio file (MP3, WAV, AAC)";

/// Broad category of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Audio,
}

/// An accepted upload type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaType {
    pub kind: MediaKind,
    pub content_type: &'static str,
    pub extension: &'static str,
}

const SUPPORTED: &[MediaType] = &[
    MediaType { kind: MediaKind::Video, content_type: "video/mp4", extension: "mp4" },
    MediaType { kind: MediaKind::Video, content_type: "video/quicktime", extension: "mov" },
    MediaType { kind: MediaKind::Video, content_type: "video/x-msvideo", extension: "avi" },
    MediaType { kind: MediaKind::Audio, content_type: "audio/mpeg", extension: "mp3" },
    MediaType { kind: MediaKind::Audio, content_type: "audio/wav", extension: "wav" },
    MediaType { kind: MediaKind::Audio, content_type: "audio/ogg", extension: "ogg" },
    MediaType { kind: MediaKind::Audio, content_type: "audio/aac", extension: "aac" },
];

impl MediaType {
    /// Detect the media type of a local file from its extension.
    pub fn from_path(path: &Path) -> ModelResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| ModelError::UnsupportedMedia(UNSUPPORTED_MEDIA_MESSAGE.to_string()))?;

        SUPPORTED
            .iter()
            .find(|m| m.extension == ext)
            .copied()
            .ok_or_else(|| ModelError::UnsupportedMedia(UNSUPPORTED_MEDIA_MESSAGE.to_string()))
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }
}
