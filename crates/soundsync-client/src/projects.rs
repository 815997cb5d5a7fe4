//! Project list view model.

use std::collections::BTreeSet;

use async_trait::async_trait;
use soundsync_firestore::{FirestoreClient, FirestoreResult, GenerationRepository, SortConfig};
use soundsync_models::{
    card_download_path, project_count_label, DisplayOptions, Generation, GenerationId, ProjectFilter,
    ProjectView,
};
use tracing::{debug, warn};

use crate::download::card_file_name;

/// Loads a user's generation records, newest update first.
#[async_trait]
pub trait GenerationSource: Send + Sync {
    async fn list_generations(&self, uid: &str) -> FirestoreResult<Vec<Generation>>;
}

/// Firestore-backed generation source.
#[derive(Clone)]
pub struct FirestoreGenerationSource {
    client: FirestoreClient,
}

impl FirestoreGenerationSource {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GenerationSource for FirestoreGenerationSource {
    async fn list_generations(&self, uid: &str) -> FirestoreResult<Vec<Generation>> {
        GenerationRepository::new(self.client.clone(), uid)
            .list(&SortConfig::default(), None)
            .await
    }
}

/// Mapped, filterable list of a user's projects.
pub struct ProjectList<S> {
    source: S,
    display: DisplayOptions,
    generations: Vec<Generation>,
    projects: Vec<ProjectView>,
    filter: ProjectFilter,
    loaded: bool,
}

impl<S: GenerationSource> ProjectList<S> {
    pub fn new(source: S, display: DisplayOptions) -> Self {
        Self {
            source,
            display,
            generations: Vec::new(),
            projects: Vec::new(),
            filter: ProjectFilter::default(),
            loaded: false,
        }
    }

    /// Reload from the store. On failure the previous list is kept and
    /// `false` is returned.
    pub async fn refresh(&mut self, uid: &str) -> bool {
        match self.source.list_generations(uid).await {
            Ok(generations) => {
                self.projects = generations
                    .iter()
                    .map(|g| ProjectView::from_record(&g.id, &g.record, &self.display))
                    .collect();
                self.generations = generations;
                self.loaded = true;
                debug!(uid = %uid, count = self.projects.len(), "Project list refreshed");
                true
            }
            Err(e) => {
                warn!(uid = %uid, "Failed to load projects, keeping previous list: {}", e);
                false
            }
        }
    }

    /// True once any load has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn filter(&self) -> &ProjectFilter {
        &self.filter
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.filter.query = query.into();
    }

    pub fn set_genre(&mut self, genre: impl Into<String>) {
        self.filter.genre = genre.into();
    }

    /// Every project, unfiltered.
    pub fn all(&self) -> &[ProjectView] {
        &self.projects
    }

    /// Projects passing the current filter, in list order.
    pub fn visible(&self) -> Vec<&ProjectView> {
        self.filter.apply(&self.projects)
    }

    /// Label for the visible count ("1 project", "3 projects").
    pub fn count_label(&self) -> String {
        project_count_label(self.visible().len())
    }

    /// Distinct genres present in the list, for a genre selector.
    pub fn genres(&self) -> Vec<String> {
        self.generations
            .iter()
            .filter_map(|g| g.record.track.as_ref()?.genre.clone())
            .filter(|g| !g.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Storage path and file name for a card's download button.
    pub fn card_download(&self, id: &GenerationId) -> Option<(Option<String>, String)> {
        let generation = self.generations.iter().find(|g| &g.id == id)?;
        let path = card_download_path(&generation.record).map(str::to_string);
        let name = card_file_name(path.as_deref());
        Some((path, name))
    }

    /// Record behind a card, for seeding a detail view.
    pub fn generation(&self, id: &GenerationId) -> Option<&Generation> {
        self.generations.iter().find(|g| &g.id == id)
    }
}
