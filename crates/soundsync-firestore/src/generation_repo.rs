//! Generation repository.
//!
//! Records live at `users/{uid}/generations/{genId}`. The raw Firestore field
//! map is converted into a typed [`GenerationRecord`] here and nowhere else;
//! anything missing or of the wrong type becomes `None`.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use soundsync_models::{Generation, GenerationId, GenerationRecord, TrackArtifact, VideoArtifact};
use tracing::{debug, info};

use crate::client::FirestoreClient;
use crate::error::FirestoreResult;
use crate::query::{build_sorted_query, SortConfig};
use crate::types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
use crate::watch::{DocumentWatch, WatchEvent};

const COLLECTION: &str = "generations";

/// Repository for one user's generation records.
#[derive(Clone)]
pub struct GenerationRepository {
    client: FirestoreClient,
    user_id: String,
}

impl GenerationRepository {
    pub fn new(client: FirestoreClient, user_id: impl Into<String>) -> Self {
        Self {
            client,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn parent_path(&self) -> String {
        format!("users/{}", self.user_id)
    }

    fn collection_path(&self) -> String {
        format!("users/{}/{}", self.user_id, COLLECTION)
    }

    /// Read one record. Missing documents are `Ok(None)`.
    pub async fn get(&self, id: &GenerationId) -> FirestoreResult<Option<GenerationRecord>> {
        let doc = self
            .client
            .get_document(&self.collection_path(), id.as_str())
            .await?;
        Ok(doc.as_ref().map(generation_from_document))
    }

    /// List records with the given ordering (dashboard: `updatedAt` descending).
    pub async fn list(&self, sort: &SortConfig, limit: Option<u32>) -> FirestoreResult<Vec<Generation>> {
        let query = build_sorted_query(COLLECTION, sort, limit);
        let docs = self.client.run_query(&self.parent_path(), query).await?;

        let generations: Vec<Generation> = docs
            .iter()
            .filter_map(|doc| {
                let id = doc.id()?;
                Some(Generation::new(
                    GenerationId::from_string(id),
                    self.user_id.clone(),
                    generation_from_document(doc),
                ))
            })
            .collect();

        debug!(user_id = %self.user_id, count = generations.len(), "Listed generations");
        Ok(generations)
    }

    /// Create a record. Timestamps default to now when the record has none.
    pub async fn create(&self, id: &GenerationId, record: &GenerationRecord) -> FirestoreResult<Generation> {
        let now = Utc::now();
        let mut record = record.clone();
        record.created_at.get_or_insert(now);
        record.updated_at.get_or_insert(now);

        let doc = self
            .client
            .create_document(&self.collection_path(), id.as_str(), record_to_fields(&record))
            .await?;

        info!(user_id = %self.user_id, generation_id = %id, "Created generation record");
        Ok(Generation::new(
            id.clone(),
            self.user_id.clone(),
            generation_from_document(&doc),
        ))
    }

    /// Persist an edited title.
    pub async fn rename(&self, id: &GenerationId, title: &str) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("title".to_string(), title.to_firestore_value());
        fields.insert("updatedAt".to_string(), Utc::now().to_firestore_value());

        self.client
            .update_document(
                &self.collection_path(),
                id.as_str(),
                fields,
                Some(vec!["title".to_string(), "updatedAt".to_string()]),
            )
            .await?;

        info!(user_id = %self.user_id, generation_id = %id, "Renamed generation");
        Ok(())
    }

    /// Start a polling watch on one record.
    pub fn watch(&self, id: &GenerationId, interval: Duration) -> GenerationWatch {
        GenerationWatch {
            inner: DocumentWatch::spawn(self.client.clone(), self.collection_path(), id.as_str(), interval),
        }
    }
}

/// Update delivered by a [`GenerationWatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    /// Record exists and changed
    Updated(GenerationRecord),
    /// Record does not exist (yet)
    Missing,
    /// A poll failed
    Error(String),
}

/// Live subscription to one generation record.
pub struct GenerationWatch {
    inner: DocumentWatch,
}

impl GenerationWatch {
    /// Next update, or `None` once cancelled.
    pub async fn next(&mut self) -> Option<GenerationEvent> {
        self.inner.next().await.map(|event| match event {
            WatchEvent::Snapshot(doc) => GenerationEvent::Updated(generation_from_document(&doc)),
            WatchEvent::Missing => GenerationEvent::Missing,
            WatchEvent::Error(e) => GenerationEvent::Error(e),
        })
    }

    /// Stop the watch; no further updates are delivered.
    pub fn cancel(&mut self) {
        self.inner.cancel();
    }
}

// ============================================================================
// Field conversion
// ============================================================================

/// Convert a document into a typed record.
pub fn generation_from_document(doc: &Document) -> GenerationRecord {
    match &doc.fields {
        Some(fields) => generation_from_fields(fields),
        None => GenerationRecord::default(),
    }
}

/// Convert a raw field map into a typed record.
pub fn generation_from_fields(fields: &HashMap<String, Value>) -> GenerationRecord {
    GenerationRecord {
        title: get_string(fields, "title"),
        track: fields.get("track").and_then(Value::as_map).map(track_from_fields),
        normal_video: fields
            .get("normal_video")
            .and_then(Value::as_map)
            .map(video_from_fields),
        ai_video: fields.get("ai_video").and_then(Value::as_map).map(video_from_fields),
        thumbnail_url: get_string(fields, "thumbnailUrl"),
        created_at: fields.get("createdAt").and_then(FromFirestoreValue::from_firestore_value),
        updated_at: fields.get("updatedAt").and_then(FromFirestoreValue::from_firestore_value),
    }
}

fn track_from_fields(fields: &HashMap<String, Value>) -> TrackArtifact {
    TrackArtifact {
        storage_path: get_string(fields, "storagePath"),
        genre: get_string(fields, "genre"),
        duration: fields.get("duration").and_then(duration_text),
        ready: get_bool(fields, "ready"),
    }
}

fn video_from_fields(fields: &HashMap<String, Value>) -> VideoArtifact {
    VideoArtifact {
        storage_path: get_string(fields, "storagePath"),
        ready: get_bool(fields, "ready"),
    }
}

/// Duration is written either as display text or as a number of seconds.
fn duration_text(value: &Value) -> Option<String> {
    match value {
        Value::StringValue(s) => Some(s.clone()),
        Value::IntegerValue(s) => s.parse::<i64>().ok().map(|n| n.to_string()),
        Value::DoubleValue(f) if f.fract() == 0.0 => Some(format!("{}", *f as i64)),
        Value::DoubleValue(f) => Some(f.to_string()),
        _ => None,
    }
}

fn get_string(fields: &HashMap<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(String::from_firestore_value)
}

fn get_bool(fields: &HashMap<String, Value>, key: &str) -> bool {
    fields
        .get(key)
        .and_then(bool::from_firestore_value)
        .unwrap_or(false)
}

/// Convert a typed record into Firestore fields. Absent values are omitted.
pub fn record_to_fields(record: &GenerationRecord) -> HashMap<String, Value> {
    let mut fields = HashMap::new();

    if let Some(title) = &record.title {
        fields.insert("title".to_string(), title.to_firestore_value());
    }
    if let Some(track) = &record.track {
        let mut map: Vec<(&str, Value)> = vec![("ready", track.ready.to_firestore_value())];
        if let Some(path) = &track.storage_path {
            map.push(("storagePath", path.to_firestore_value()));
        }
        if let Some(genre) = &track.genre {
            map.push(("genre", genre.to_firestore_value()));
        }
        if let Some(duration) = &track.duration {
            map.push(("duration", duration.to_firestore_value()));
        }
        fields.insert("track".to_string(), Value::map(map));
    }
    for (key, video) in [("normal_video", &record.normal_video), ("ai_video", &record.ai_video)] {
        if let Some(video) = video {
            fields.insert(key.to_string(), video_to_value(video));
        }
    }
    if let Some(url) = &record.thumbnail_url {
        fields.insert("thumbnailUrl".to_string(), url.to_firestore_value());
    }
    if let Some(ts) = record.created_at {
        fields.insert("createdAt".to_string(), ts.to_firestore_value());
    }
    if let Some(ts) = record.updated_at {
        fields.insert("updatedAt".to_string(), ts.to_firestore_value());
    }

    fields
}

fn video_to_value(video: &VideoArtifact) -> Value {
    let mut map: Vec<(&str, Value)> = vec![("ready", video.ready.to_firestore_value())];
    if let Some(path) = &video.storage_path {
        map.push(("storagePath", path.to_firestore_value()));
    }
    Value::map(map)
}
