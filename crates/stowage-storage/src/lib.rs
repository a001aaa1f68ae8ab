//! Stowage Storage Library
//!
//! This crate provides the object-storage file adapter: the `FileAdapter`
//! trait a content framework drives, and `OssAdapter`, its implementation for
//! S3-compatible services.
//!
//! # Storage key format
//!
//! Keys are absolute, `/`-separated paths inside a bucket:
//!
//! - record has a `path`: `{record.path}/{filename}`
//! - otherwise, adapter has a `path`: `{config.path}/{filename}`
//! - otherwise: `/{filename}`
//!
//! Keys are normalized and `..` never leaves the bucket root. Key generation
//! is centralized in the `keys` module.
//!
//! # Buckets
//!
//! New uploads always go to the configured bucket. Records carrying a
//! different `bucket` (e.g. left over from a migration) are served by a
//! client built for that bucket on demand.

pub mod adapter;
pub mod client;
pub mod factory;
pub mod keys;
pub mod naming;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use adapter::{normalize_etag, OssAdapter, OssAdapterBuilder};
pub use client::{BucketUrl, ObjectClient, ObjectStoreClient, RemoteResponse};
pub use factory::{create_adapter, ClientFactory};
#[cfg(feature = "storage-s3")]
pub use factory::S3ClientFactory;
pub use naming::{FilenameGenerator, FnFilename, OriginalFilename, RandomFilename};
pub use stowage_core::{FileRecord, LocalSource, OssConfig, SchemaFields};
pub use traits::{FileAdapter, StorageError, StorageResult};
