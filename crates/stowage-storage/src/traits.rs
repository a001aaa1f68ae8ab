//! Storage adapter trait
//!
//! This module defines the `FileAdapter` trait a content framework drives, and
//! the error type shared by every operation in this crate.

use async_trait::async_trait;
use http::{HeaderMap, StatusCode};
use stowage_core::FileRecord;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Filename generation failed: {0}")]
    Naming(String),

    #[error("Upload of {key} failed: storage returned status code {status}")]
    Upload { key: String, status: StatusCode },

    #[error("Upload of {key} failed: storage returned no ETag")]
    MissingEtag { key: String },

    #[error("Existence check of {key} failed: storage returned status code {status}")]
    ExistenceCheck { key: String, status: StatusCode },

    #[error("Delete of {key} failed: storage returned status code {status}")]
    Deletion { key: String, status: StatusCode },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("File record has no local source to upload")]
    MissingSource,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport failures are surfaced as the object store reported them.
    #[error(transparent)]
    Transport(#[from] object_store::Error),
}

impl StorageError {
    /// Remote status code carried by the error, if the service answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            StorageError::Upload { status, .. }
            | StorageError::ExistenceCheck { status, .. }
            | StorageError::Deletion { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A pluggable file storage adapter.
///
/// The calling framework hands over records produced by its upload pipeline
/// and reads back the fields the adapter fills in (`filename`, `path`,
/// `bucket`, `etag`). Nothing is retried; a failed call leaves the record as
/// it was.
#[async_trait]
pub trait FileAdapter: Send + Sync {
    /// Store the record's local bytes under a freshly generated name.
    ///
    /// On success the record's `filename`, `etag`, `path` and `bucket` are
    /// updated. On failure the record is untouched.
    async fn upload_file(&self, record: &mut FileRecord) -> StorageResult<()>;

    /// Delete the stored object, honoring the record's bucket and path.
    async fn remove_file(&self, record: &FileRecord) -> StorageResult<()>;

    /// Look up an object by filename in the default bucket and prefix.
    ///
    /// Returns the object's headers, or `None` if it does not exist.
    async fn file_exists(&self, filename: &str) -> StorageResult<Option<HeaderMap>>;

    /// Public HTTPS URL of the stored object. Does not check the object exists.
    fn file_url(&self, record: &FileRecord) -> StorageResult<String>;
}
