//! Storage key resolution.
//!
//! A key is the absolute, `/`-separated name of an object inside its bucket.
//! The directory part comes from the record's own `path`, falling back to the
//! adapter's configured path, falling back to the bucket root.

use stowage_core::FileRecord;

use crate::traits::{StorageError, StorageResult};

/// Resolve the absolute key for `record`.
///
/// The filename must already be set: uploads generate it first, lookups wrap
/// the caller's filename into a record.
pub fn resolve_key(record: &FileRecord, default_path: Option<&str>) -> StorageResult<String> {
    let filename = record
        .filename
        .as_deref()
        .filter(|f| !f.is_empty())
        .ok_or_else(|| StorageError::InvalidKey("file record has no filename".to_string()))?;

    let prefix = record.path.as_deref().or(default_path).unwrap_or("/");

    let key = join(prefix, filename);
    if key == "/" {
        return Err(StorageError::InvalidKey(format!(
            "filename {:?} does not name an object",
            filename
        )));
    }
    Ok(key)
}

/// Object-store location for a key: the same segments without the leading `/`.
pub fn object_path(key: &str) -> &str {
    key.trim_start_matches('/')
}

/// Join and normalize POSIX-style. `..` never climbs above the root and the
/// result is always absolute.
fn join(prefix: &str, name: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for part in prefix.split('/').chain(name.split('/')) {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}
