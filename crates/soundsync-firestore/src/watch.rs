//! Polling document watch.
//!
//! The REST surface has no push channel, so a watch re-reads the document on
//! a fixed interval and emits only when its `updateTime` moves. Dropping the
//! handle (or calling [`DocumentWatch::cancel`]) stops the poller; no event
//! is delivered after that.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::client::FirestoreClient;
use crate::metrics::record_watch_snapshot;
use crate::types::Document;

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Something observed about the watched document.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// Document exists and changed since the last snapshot
    Snapshot(Document),
    /// Document does not exist (emitted once per disappearance)
    Missing,
    /// A poll failed; polling continues
    Error(String),
}

/// Handle to a running document watch.
pub struct DocumentWatch {
    events: mpsc::Receiver<WatchEvent>,
    task: JoinHandle<()>,
}

impl DocumentWatch {
    /// Start polling `collection/doc_id`.
    pub fn spawn(
        client: FirestoreClient,
        collection: impl Into<String>,
        doc_id: impl Into<String>,
        interval: Duration,
    ) -> Self {
        let collection = collection.into();
        let doc_id = doc_id.into();
        let (tx, events) = mpsc::channel(16);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // None = nothing seen yet, Some(None) = missing, Some(Some(t)) = last updateTime
            let mut last_seen: Option<Option<String>> = None;

            loop {
                ticker.tick().await;

                let event = match client.get_document(&collection, &doc_id).await {
                    Ok(Some(doc)) => {
                        let version = Some(doc.update_time.clone().unwrap_or_default());
                        if last_seen.as_ref() == Some(&version) {
                            continue;
                        }
                        last_seen = Some(version);
                        record_watch_snapshot();
                        WatchEvent::Snapshot(doc)
                    }
                    Ok(None) => {
                        if last_seen == Some(None) {
                            continue;
                        }
                        last_seen = Some(None);
                        WatchEvent::Missing
                    }
                    Err(e) => {
                        warn!(collection = %collection, doc_id = %doc_id, "Watch poll failed: {}", e);
                        WatchEvent::Error(e.to_string())
                    }
                };

                if tx.send(event).await.is_err() {
                    debug!(collection = %collection, doc_id = %doc_id, "Watch receiver dropped");
                    break;
                }
            }
        });

        Self { events, task }
    }

    /// Next event, or `None` once the watch is cancelled.
    pub async fn next(&mut self) -> Option<WatchEvent> {
        self.events.recv().await
    }

    /// Stop polling. Pending events are discarded.
    pub fn cancel(&mut self) {
        self.task.abort();
        self.events.close();
        while self.events.try_recv().is_ok() {}
    }

}

impl Drop for DocumentWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}
