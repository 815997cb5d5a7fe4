//! User profile repository.

use std::collections::HashMap;

use soundsync_models::{UserProfile, UserStats};
use tracing::info;

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{FromFirestoreValue, ToFirestoreValue, Value};

const COLLECTION: &str = "users";

/// Repository for `users/{uid}` profile documents.
#[derive(Clone)]
pub struct UserRepository {
    client: FirestoreClient,
}

impl UserRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Read a profile.
    pub async fn get(&self, uid: &str) -> FirestoreResult<Option<UserProfile>> {
        let doc = self.client.get_document(COLLECTION, uid).await?;
        Ok(doc.map(|d| profile_from_fields(uid, &d.fields.unwrap_or_default())))
    }

    /// Create the profile on first sign-in. Existing profiles are left alone.
    ///
    /// Returns `true` when a document was created.
    pub async fn ensure_user_doc(&self, profile: &UserProfile) -> FirestoreResult<bool> {
        if self.client.get_document(COLLECTION, &profile.uid).await?.is_some() {
            return Ok(false);
        }

        match self
            .client
            .create_document(COLLECTION, &profile.uid, profile_to_fields(profile))
            .await
        {
            Ok(_) => {
                info!(uid = %profile.uid, "Created user profile");
                Ok(true)
            }
            // Another session created it between the read and the write
            Err(FirestoreError::AlreadyExists(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn profile_to_fields(profile: &UserProfile) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("email".to_string(), profile.email.to_firestore_value());
    fields.insert("displayName".to_string(), profile.display_name.to_firestore_value());
    if let Some(ts) = profile.created_at {
        fields.insert("createdAt".to_string(), ts.to_firestore_value());
    }
    fields.insert(
        "stats".to_string(),
        Value::map([
            ("generations", profile.stats.generations.to_firestore_value()),
            ("downloads", profile.stats.downloads.to_firestore_value()),
        ]),
    );
    fields
}

fn profile_from_fields(uid: &str, fields: &HashMap<String, Value>) -> UserProfile {
    let stats = fields.get("stats").and_then(Value::as_map);
    let counter = |key: &str| {
        stats
            .and_then(|s| s.get(key))
            .and_then(u64::from_firestore_value)
            .unwrap_or(0)
    };

    UserProfile {
        uid: uid.to_string(),
        email: fields.get("email").and_then(String::from_firestore_value),
        display_name: fields.get("displayName").and_then(String::from_firestore_value),
        created_at: fields.get("createdAt").and_then(FromFirestoreValue::from_firestore_value),
        stats: UserStats {
            generations: counter("generations"),
            downloads: counter("downloads"),
        },
    }
}
