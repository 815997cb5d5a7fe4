//! User profile models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Usage counters kept on the profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    #[serde(default)]
    pub generations: u64,
    #[serde(default)]
    pub downloads: u64,
}

/// Profile document stored at `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stats: UserStats,
}

impl UserProfile {
    /// Profile written on first sign-in.
    pub fn new(uid: impl Into<String>, email: Option<String>, display_name: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            email,
            display_name,
            created_at: Some(Utc::now()),
            stats: UserStats::default(),
        }
    }
}

/// Display name given to new email accounts: the local part of the address.
pub fn default_display_name(email: &str) -> Option<String> {
    email
        .split('@')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
