//! Generation status tracking.
//!
//! The pipeline flips `ready` flags in the stored record when outputs exist.
//! `StatusTracker` folds a sequence of snapshots into the state a detail view
//! needs: whether it is still processing and the latest known artifact paths.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::generation::{ArtifactKind, GenerationRecord};

/// Processing state of an observed generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// Waiting for the pipeline to mark an output ready
    #[default]
    Pending,
    /// Track or AI video is ready
    Ready,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Ready => "ready",
        }
    }

    /// Ready is terminal: no snapshot moves it back to pending.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Ready)
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What changed when a snapshot was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusChange {
    /// Pending -> Ready happened on this snapshot
    pub became_ready: bool,
    /// Track path was set or replaced
    pub track_path_changed: bool,
    /// AI video path was set or replaced
    pub ai_video_path_changed: bool,
    /// Title was set or replaced
    pub title_changed: bool,
}

impl StatusChange {
    pub fn is_empty(&self) -> bool {
        !self.became_ready && !self.track_path_changed && !self.ai_video_path_changed && !self.title_changed
    }
}

/// Local status of one observed generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTracker {
    pub status: GenerationStatus,
    pub track_path: Option<String>,
    pub ai_video_path: Option<String>,
    pub title: Option<String>,
    /// Number of snapshots applied
    pub updates: u64,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with paths already known to the caller (upload flow, list view).
    pub fn seeded(track_path: Option<String>, ai_video_path: Option<String>) -> Self {
        Self {
            track_path: track_path.filter(|p| !p.is_empty()),
            ai_video_path: ai_video_path.filter(|p| !p.is_empty()),
            ..Self::default()
        }
    }

    /// True while no output has been observed ready.
    pub fn is_processing(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Apply one snapshot.
    ///
    /// Paths present in the snapshot replace local ones even before the ready
    /// flag flips; absent paths never clear local ones. The status only moves
    /// forward.
    pub fn apply(&mut self, record: &GenerationRecord) -> StatusChange {
        let mut change = StatusChange::default();
        self.updates += 1;

        if self.status == GenerationStatus::Pending && record.has_ready_output() {
            self.status = GenerationStatus::Ready;
            change.became_ready = true;
        }

        if let Some(path) = record.storage_path(ArtifactKind::Track) {
            if self.track_path.as_deref() != Some(path) {
                self.track_path = Some(path.to_string());
                change.track_path_changed = true;
            }
        }

        if let Some(path) = record.storage_path(ArtifactKind::AiVideo) {
            if self.ai_video_path.as_deref() != Some(path) {
                self.ai_video_path = Some(path.to_string());
                change.ai_video_path_changed = true;
            }
        }

        if let Some(title) = record.title() {
            if self.title.as_deref() != Some(title) {
                self.title = Some(title.to_string());
                change.title_changed = true;
            }
        }

        change
    }
}
