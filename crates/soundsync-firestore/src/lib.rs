//! Firestore REST API client.
//!
//! This crate provides:
//! - An ID-token authorized client with retry and metrics
//! - Typed repositories for generations and user profiles
//! - Polling document watches with cancellable handles

pub mod client;
pub mod error;
pub mod generation_repo;
pub mod metrics;
pub mod query;
pub mod retry;
pub mod types;
pub mod user_repo;
pub mod watch;


pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use generation_repo::{
    generation_from_document, generation_from_fields, record_to_fields, GenerationEvent,
    GenerationRepository, GenerationWatch,
};
pub use query::{GenerationSortField, SortConfig, SortDirection};
pub use retry::RetryConfig;
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
pub use user_repo::UserRepository;
pub use watch::{DocumentWatch, WatchEvent, DEFAULT_POLL_INTERVAL};
