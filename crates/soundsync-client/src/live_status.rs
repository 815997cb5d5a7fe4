//! Live status of the displayed generation.
//!
//! Exactly one record is observed at a time. Attaching to a record releases
//! the previous subscription and bumps the epoch stored alongside the state;
//! updates are applied only if their epoch still matches, so nothing from an
//! old record lands after a retarget. Subscription setup waits for a signed-in
//! user instead of failing.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use soundsync_firestore::{FirestoreClient, GenerationEvent, GenerationRepository};
use soundsync_models::{DisplayOptions, GenerationId, GenerationRecord, ProjectView, StatusTracker};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::session::SessionContext;

/// Stream of updates for one record.
pub type RecordStream = Pin<Box<dyn Stream<Item = GenerationEvent> + Send>>;

/// Opens live record streams.
pub trait RecordWatcher: Send + Sync {
    fn watch(&self, uid: &str, id: &GenerationId) -> RecordStream;
}

/// Polling watcher backed by Firestore.
#[derive(Clone)]
pub struct FirestoreRecordWatcher {
    client: FirestoreClient,
    interval: Duration,
}

impl FirestoreRecordWatcher {
    pub fn new(client: FirestoreClient, interval: Duration) -> Self {
        Self { client, interval }
    }
}

impl RecordWatcher for FirestoreRecordWatcher {
    fn watch(&self, uid: &str, id: &GenerationId) -> RecordStream {
        let watch = GenerationRepository::new(self.client.clone(), uid).watch(id, self.interval);
        Box::pin(futures_util::stream::unfold(watch, |mut watch| async move {
            watch.next().await.map(|event| (event, watch))
        }))
    }
}

/// Paths the caller already knows before the first snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSeed {
    pub track_path: Option<String>,
    pub ai_video_path: Option<String>,
}

/// Published state of the subscriber.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveStatus {
    /// Record currently observed
    pub generation_id: Option<GenerationId>,
    /// Incremented on every attach and detach
    pub epoch: u64,
    pub tracker: StatusTracker,
    /// Latest record snapshot
    pub record: Option<GenerationRecord>,
    /// View model of the latest snapshot
    pub view: Option<ProjectView>,
}

impl LiveStatus {
    pub fn is_processing(&self) -> bool {
        self.tracker.is_processing()
    }

    pub fn track_path(&self) -> Option<&str> {
        self.tracker.track_path.as_deref()
    }

    pub fn ai_video_path(&self) -> Option<&str> {
        self.tracker.ai_video_path.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.tracker.title.as_deref()
    }
}

/// Subscribes to one generation record at a time.
pub struct LiveStatusSubscriber {
    session: SessionContext,
    watcher: Arc<dyn RecordWatcher>,
    display: DisplayOptions,
    state: watch::Sender<LiveStatus>,
    task: Option<JoinHandle<()>>,
}

impl LiveStatusSubscriber {
    pub fn new(session: SessionContext, watcher: Arc<dyn RecordWatcher>, display: DisplayOptions) -> Self {
        let (state, _) = watch::channel(LiveStatus::default());
        Self {
            session,
            watcher,
            display,
            state,
            task: None,
        }
    }

    /// Current state.
    pub fn status(&self) -> LiveStatus {
        self.state.borrow().clone()
    }

    /// Receiver notified on every applied update.
    pub fn observe(&self) -> watch::Receiver<LiveStatus> {
        self.state.subscribe()
    }

    /// Observe `id`, releasing any previous subscription first.
    pub fn attach(&mut self, id: GenerationId, seed: StatusSeed) {
        self.release();

        let mut epoch = 0;
        self.state.send_modify(|s| {
            epoch = s.epoch + 1;
            *s = LiveStatus {
                generation_id: Some(id.clone()),
                epoch,
                tracker: StatusTracker::seeded(seed.track_path.clone(), seed.ai_video_path.clone()),
                record: None,
                view: None,
            };
        });
        debug!(generation_id = %id, epoch, "Attaching live status");

        let session = self.session.clone();
        let watcher = self.watcher.clone();
        let display = self.display.clone();
        let state = self.state.clone();

        self.task = Some(tokio::spawn(async move {
            let mut auth = session.observe();
            let Some(uid) = auth.signed_in_uid().await else {
                return;
            };
            auth.detach();

            let mut stream = watcher.watch(&uid, &id);
            while let Some(event) = stream.next().await {
                match event {
                    GenerationEvent::Updated(record) => apply_update(&state, epoch, &id, record, &display),
                    GenerationEvent::Missing => debug!(generation_id = %id, "Record does not exist yet"),
                    GenerationEvent::Error(e) => warn!(generation_id = %id, "Live status update failed: {}", e),
                }
            }
        }));
    }

    /// Stop observing. Published state is cleared.
    pub fn detach(&mut self) {
        self.release();
        self.state.send_modify(|s| {
            *s = LiveStatus {
                epoch: s.epoch + 1,
                ..LiveStatus::default()
            };
        });
    }

    pub fn is_attached(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for LiveStatusSubscriber {
    fn drop(&mut self) {
        self.release();
    }
}

fn apply_update(
    state: &watch::Sender<LiveStatus>,
    epoch: u64,
    id: &GenerationId,
    record: GenerationRecord,
    display: &DisplayOptions,
) {
    state.send_if_modified(|s| {
        if s.epoch != epoch {
            return false;
        }
        let change = s.tracker.apply(&record);
        if change.became_ready {
            info!(generation_id = %id, "Generation ready");
        }
        let mut view = ProjectView::from_record(id, &record, display);
        // Ready is terminal even if a later snapshot drops the flags
        view.processing = s.tracker.is_processing();
        s.view = Some(view);
        s.record = Some(record);
        true
    });
}
