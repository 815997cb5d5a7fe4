//! Client-side project filtering.

use serde::{Deserialize, Serialize};

use crate::project::ProjectView;

/// Genre selector value matching every project.
pub const ALL_GENRES: &str = "all";

/// Text and genre filter applied to a project list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFilter {
    /// Case-insensitive substring matched against title, track name and genre
    #[serde(default)]
    pub query: String,
    /// `"all"` or a genre matched case-insensitively
    #[serde(default = "default_genre")]
    pub genre: String,
}

fn default_genre() -> String {
    ALL_GENRES.to_string()
}

impl Default for ProjectFilter {
    fn default() -> Self {
        Self {
            query: String::new(),
            genre: default_genre(),
        }
    }
}

impl ProjectFilter {
    pub fn new(query: impl Into<String>, genre: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            genre: genre.into(),
        }
    }

    /// Check whether a project passes both the text and the genre filter.
    pub fn matches(&self, project: &ProjectView) -> bool {
        let query = self.query.to_lowercase();
        let text_match = project.title.to_lowercase().contains(&query)
            || project.track_name.to_lowercase().contains(&query)
            || project.genre.to_lowercase().contains(&query);

        let genre_match = self.genre == ALL_GENRES
            || project.genre.to_lowercase() == self.genre.to_lowercase();

        text_match && genre_match
    }

    /// Filter projects, preserving order.
    pub fn apply<'a>(&self, projects: &'a [ProjectView]) -> Vec<&'a ProjectView> {
        projects.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Count label shown above a project grid.
pub fn project_count_label(count: usize) -> String {
    if count == 1 {
        "1 project".to_string()
    } else {
        format!("{} projects", count)
    }
}
