//! Stowage Core Library
//!
//! Configuration, the file record model and schema field declarations shared
//! by the storage adapter and the frameworks embedding it.

pub mod config;
pub mod models;
pub mod schema;

// Re-export commonly used types
pub use config::{Credentials, OssConfig};
pub use models::{FileRecord, LocalSource};
pub use schema::{SchemaFields, COMPATIBILITY_LEVEL, SCHEMA_TYPES};
