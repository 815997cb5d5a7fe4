//! Firestore metrics.
//!
//! Without an installed recorder the `metrics` facade drops everything.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::error::FirestoreResult;

pub mod names {
    pub const REQUESTS_TOTAL: &str = "soundsync_firestore_requests_total";
    pub const RETRIES_TOTAL: &str = "soundsync_firestore_retries_total";
    pub const LATENCY_SECONDS: &str = "soundsync_firestore_latency_seconds";
    /// Generation documents returned by list queries
    pub const QUERY_DOCUMENTS_TOTAL: &str = "soundsync_firestore_query_documents_total";
    /// Changed snapshots delivered by document watches
    pub const WATCH_SNAPSHOTS_TOTAL: &str = "soundsync_firestore_watch_snapshots_total";
}

/// HTTP-ish status label for a finished request.
pub fn outcome_status<T>(result: &FirestoreResult<T>) -> u16 {
    match result {
        Ok(_) => 200,
        Err(e) => e.http_status().unwrap_or(500),
    }
}

/// Count a finished request and record its latency.
pub fn record_request(operation: &str, status: u16, elapsed: Duration) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(names::LATENCY_SECONDS, "operation" => operation.to_string()).record(elapsed.as_secs_f64());
}

pub fn record_retry(operation: &str) {
    counter!(names::RETRIES_TOTAL, "operation" => operation.to_string()).increment(1);
}

pub fn record_query_documents(count: usize) {
    counter!(names::QUERY_DOCUMENTS_TOTAL).increment(count as u64);
}

pub fn record_watch_snapshot() {
    counter!(names::WATCH_SNAPSHOTS_TOTAL).increment(1);
}
