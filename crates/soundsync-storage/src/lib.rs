//! Blob store clients for generation artifacts.
//!
//! This crate provides:
//! - The `BlobStore` trait (resolve a path to a URL, upload a file)
//! - A Firebase Storage client authorized with the user's ID token
//! - An S3-compatible client issuing presigned GET URLs

pub mod blob;
pub mod error;
pub mod firebase;
pub mod s3;

pub use blob::{blob_store_from_env, BlobStore, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use firebase::{FirebaseStorageClient, FirebaseStorageConfig};
pub use s3::{S3Client, S3Config};
