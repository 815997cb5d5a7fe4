//! Project view model.
//!
//! `ProjectView` is the display-safe projection of a generation record used by
//! list and detail views. It is recomputed from every upstream snapshot and
//! never mutated in place.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::generation::{ArtifactKind, GenerationId, GenerationRecord};

/// Title shown when a record has none.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Track name shown when no track path exists yet.
pub const DEFAULT_TRACK_NAME: &str = "track.mp3";

/// Placeholder for missing genre and duration.
pub const MISSING_FIELD: &str = "—";

/// Thumbnail used when the record has none.
pub const PLACEHOLDER_THUMBNAIL: &str = "/placeholder.svg";

/// Default date format (month/day/year without padding).
pub const DEFAULT_DATE_FORMAT: &str = "%-m/%-d/%Y";

/// How timestamps are rendered in view models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOptions {
    /// chrono `strftime` format for dates
    pub date_format: String,
    /// Offset of the viewer's local time zone
    pub utc_offset: FixedOffset,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            utc_offset: Utc.fix(),
        }
    }
}

impl DisplayOptions {
    /// Create display options with a format and an offset in minutes east of UTC.
    ///
    /// Unparseable formats fall back to [`DEFAULT_DATE_FORMAT`] and
    /// out-of-range offsets fall back to UTC.
    pub fn new(date_format: impl Into<String>, offset_minutes: i32) -> Self {
        let mut date_format = date_format.into();
        if !is_valid_date_format(&date_format) {
            date_format = DEFAULT_DATE_FORMAT.to_string();
        }

        Self {
            date_format,
            utc_offset: offset_minutes
                .checked_mul(60)
                .and_then(FixedOffset::east_opt)
                .unwrap_or_else(|| Utc.fix()),
        }
    }

    /// Render a timestamp, or an empty string if the format cannot be applied.
    pub fn format_date(&self, ts: DateTime<Utc>) -> String {
        let mut out = String::new();
        match write!(out, "{}", ts.with_timezone(&self.utc_offset).format(&self.date_format)) {
            Ok(()) => out,
            Err(_) => String::new(),
        }
    }
}

/// True when chrono can parse every specifier in `fmt`.
pub fn is_valid_date_format(fmt: &str) -> bool {
    !StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error))
}

/// Flattened, display-ready projection of a generation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: GenerationId,
    pub title: String,
    pub video_name: String,
    pub track_name: String,
    pub genre: String,
    pub duration: String,
    pub created_at: String,
    pub thumbnail: String,
    /// True until either generated output is ready
    pub processing: bool,
}

impl ProjectView {
    /// Map a typed record into its view model.
    ///
    /// Never fails: every absent field resolves to its documented default.
    pub fn from_record(id: &GenerationId, record: &GenerationRecord, opts: &DisplayOptions) -> Self {
        let title = record.title().unwrap_or(DEFAULT_TITLE).to_string();

        let video_name = record
            .storage_path(ArtifactKind::NormalVideo)
            .and_then(last_path_segment)
            .map(str::to_string)
            .unwrap_or_else(|| title.clone());

        let track_name = record
            .storage_path(ArtifactKind::Track)
            .and_then(last_path_segment)
            .unwrap_or(DEFAULT_TRACK_NAME)
            .to_string();

        let track = record.track.as_ref();
        let genre = track
            .and_then(|t| t.genre.as_deref())
            .filter(|g| !g.is_empty())
            .unwrap_or(MISSING_FIELD)
            .to_string();
        let duration = track
            .and_then(|t| t.duration.as_deref())
            .filter(|d| !d.is_empty())
            .unwrap_or(MISSING_FIELD)
            .to_string();

        let created_at = record
            .created_at
            .map(|ts| opts.format_date(ts))
            .unwrap_or_default();

        let thumbnail = record
            .thumbnail_url
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(PLACEHOLDER_THUMBNAIL)
            .to_string();

        Self {
            id: id.clone(),
            title,
            video_name,
            track_name,
            genre,
            duration,
            created_at,
            thumbnail,
            processing: !record.has_ready_output(),
        }
    }
}

/// Last `/`-separated segment of a storage path, ignoring empty segments.
pub fn last_path_segment(path: &str) -> Option<&str> {
    path.rsplit('/').find(|s| !s.is_empty())
}

/// Path a list-card download should fetch: the track, else the AI video.
pub fn card_download_path(record: &GenerationRecord) -> Option<&str> {
    record
        .storage_path(ArtifactKind::Track)
        .or_else(|| record.storage_path(ArtifactKind::AiVideo))
}

/// File name suggested for downloading an artifact of a titled project.
///
/// Follows `"{title}.{ext}"`, falling back to `"track.mp3"` / `"video.mp4"`.
pub fn suggested_file_name(title: Option<&str>, kind: ArtifactKind) -> String {
    let stem = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(kind.fallback_stem());
    format!("{}.{}", stem, kind.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{TrackArtifact, VideoArtifact};
    use chrono::TimeZone;

    fn id() -> GenerationId {
        GenerationId::from_string("g1")
    }

    #[test]
    fn test_empty_record_uses_defaults() {
        let view = ProjectView::from_record(&id(), &GenerationRecord::default(), &DisplayOptions::default());
        assert_eq!(view.title, "Untitled");
        assert_eq!(view.track_name, "track.mp3");
        assert_eq!(view.genre, "—");
        assert_eq!(view.duration, "—");
        assert_eq!(view.video_name, "Untitled");
        assert_eq!(view.created_at, "");
        assert_eq!(view.thumbnail, "/placeholder.svg");
        assert!(view.processing);
    }

    #[test]
    fn test_ready_track_maps_name_and_clears_processing() {
        let record = GenerationRecord {
            track: Some(TrackArtifact {
                storage_path: Some("u1/g1/track.mp3".into()),
                ready: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        let view = ProjectView::from_record(&id(), &record, &DisplayOptions::default());
        assert_eq!(view.track_name, "track.mp3");
        assert!(!view.processing);
    }

    #[test]
    fn test_video_name_from_normal_video_path() {
        let record = GenerationRecord {
            title: Some("Sunset".into()),
            normal_video: Some(VideoArtifact {
                storage_path: Some("users/u1/generations/g1/beach.mov".into()),
                ready: true,
            }),
            ..Default::default()
        };
        let view = ProjectView::from_record(&id(), &record, &DisplayOptions::default());
        assert_eq!(view.video_name, "beach.mov");
        assert_eq!(view.title, "Sunset");
    }

    #[test]
    fn test_video_name_falls_back_to_title() {
        let record = GenerationRecord {
            title: Some("Sunset".into()),
            ..Default::default()
        };
        let view = ProjectView::from_record(&id(), &record, &DisplayOptions::default());
        assert_eq!(view.video_name, "Sunset");
    }

    #[test]
    fn test_empty_genre_uses_placeholder() {
        let record = GenerationRecord {
            track: Some(TrackArtifact {
                genre: Some(String::new()),
                duration: Some("2:45".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let view = ProjectView::from_record(&id(), &record, &DisplayOptions::default());
        assert_eq!(view.genre, "—");
        assert_eq!(view.duration, "2:45");
    }

    #[test]
    fn test_created_at_formatting_uses_offset() {
        let record = GenerationRecord {
            created_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap()),
            ..Default::default()
        };
        let utc = ProjectView::from_record(&id(), &record, &DisplayOptions::default());
        assert_eq!(utc.created_at, "3/1/2024");

        let west = ProjectView::from_record(&id(), &record, &DisplayOptions::new(DEFAULT_DATE_FORMAT, -300));
        assert_eq!(west.created_at, "2/29/2024");
    }

    #[test]
    fn test_invalid_date_format_never_panics() {
        let record = GenerationRecord {
            created_at: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            ..Default::default()
        };

        let opts = DisplayOptions::new("%Q", 0);
        assert_eq!(opts.date_format, DEFAULT_DATE_FORMAT);
        assert_eq!(ProjectView::from_record(&id(), &record, &opts).created_at, "1/2/2024");

        // Fields are public, so the mapper must cope with a format that skipped validation
        let raw = DisplayOptions {
            date_format: "%Y %Q".into(),
            ..Default::default()
        };
        assert_eq!(ProjectView::from_record(&id(), &record, &raw).created_at, "");
    }

    #[test]
    fn test_out_of_range_offset_falls_back_to_utc() {
        for minutes in [i32::MAX / 10, i32::MIN, 24 * 60] {
            assert_eq!(DisplayOptions::new("%Y", minutes).utc_offset, Utc.fix());
        }
        assert_eq!(
            DisplayOptions::new("%Y", 330).utc_offset,
            FixedOffset::east_opt(330 * 60).unwrap()
        );
    }

    #[test]
    fn test_is_valid_date_format() {
        assert!(is_valid_date_format(DEFAULT_DATE_FORMAT));
        assert!(is_valid_date_format("%Y-%m-%d %H:%M"));
        assert!(!is_valid_date_format("%Q"));
        assert!(!is_valid_date_format("%"));
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let record = GenerationRecord {
            title: Some("A".into()),
            created_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        let opts = DisplayOptions::default();
        assert_eq!(
            ProjectView::from_record(&id(), &record, &opts),
            ProjectView::from_record(&id(), &record, &opts)
        );
    }

    #[test]
    fn test_last_path_segment() {
        assert_eq!(last_path_segment("a/b/c.mp3"), Some("c.mp3"));
        assert_eq!(last_path_segment("c.mp3"), Some("c.mp3"));
        assert_eq!(last_path_segment("a/b/"), Some("b"));
        assert_eq!(last_path_segment(""), None);
    }

    #[test]
    fn test_card_download_prefers_track() {
        let mut record = GenerationRecord {
            ai_video: Some(VideoArtifact {
                storage_path: Some("u1/g1/ai.mp4".into()),
                ready: false,
            }),
            ..Default::default()
        };
        assert_eq!(card_download_path(&record), Some("u1/g1/ai.mp4"));

        record.track = Some(TrackArtifact {
            storage_path: Some("u1/g1/track.mp3".into()),
            ..Default::default()
        });
        assert_eq!(card_download_path(&record), Some("u1/g1/track.mp3"));
    }

    #[test]
    fn test_suggested_file_name() {
        assert_eq!(suggested_file_name(Some("Epic"), ArtifactKind::Track), "Epic.mp3");
        assert_eq!(suggested_file_name(None, ArtifactKind::Track), "track.mp3");
        assert_eq!(suggested_file_name(Some("  "), ArtifactKind::AiVideo), "video.mp4");
    }
}
