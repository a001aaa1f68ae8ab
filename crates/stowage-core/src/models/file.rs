//! File record model: the framework's view of an uploaded file.

use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Where the bytes of a file waiting to be uploaded live.
#[derive(Debug, Clone)]
pub enum LocalSource {
    /// A file on the local filesystem (e.g. a multipart upload spooled to disk).
    Path(PathBuf),
    /// Bytes already held in memory.
    Bytes(Bytes),
}

/// Logical descriptor of a stored file.
///
/// `path` and `bucket` are per-record overrides: a collection can hold files
/// living in different buckets or prefixes, which is what makes slow data
/// migrations possible. When they are unset the adapter defaults apply.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    pub filename: Option<String>,
    #[serde(default)]
    pub originalname: String,
    #[serde(default)]
    pub mimetype: String,
    #[serde(default)]
    pub size: u64,
    #[serde(skip)]
    pub source: Option<LocalSource>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl PartialEq for LocalSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LocalSource::Path(a), LocalSource::Path(b)) => a == b,
            (LocalSource::Bytes(a), LocalSource::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl FileRecord {
    /// A record for a file about to be uploaded.
    pub fn new(
        originalname: impl Into<String>,
        mimetype: impl Into<String>,
        size: u64,
        source: LocalSource,
    ) -> Self {
        FileRecord {
            originalname: originalname.into(),
            mimetype: mimetype.into(),
            size,
            source: Some(source),
            ..Default::default()
        }
    }

    /// Build an upload record from in-memory bytes; `size` is taken from the buffer.
    pub fn from_bytes(
        originalname: impl Into<String>,
        mimetype: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        let size = data.len() as u64;
        Self::new(originalname, mimetype, size, LocalSource::Bytes(data))
    }

    /// A record that only names an already-stored object in the default
    /// bucket and prefix.
    pub fn named(filename: impl Into<String>) -> Self {
        FileRecord {
            filename: Some(filename.into()),
            ..Default::default()
        }
    }

    /// Extension of the original upload name, if any.
    pub fn original_extension(&self) -> Option<&str> {
        let name = self.originalname.rsplit('/').next()?;
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_sets_size() {
        let record = FileRecord::from_bytes("a.txt", "text/plain", &b"hello"[..]);
        assert_eq!(record.size, 5);
        assert!(record.filename.is_none());
    }

    #[test]
    fn original_extension() {
        let ext = |name: &str| {
            FileRecord::from_bytes(name, "", Bytes::new())
                .original_extension()
                .map(String::from)
        };
        assert_eq!(ext("a.TXT").as_deref(), Some("TXT"));
        assert_eq!(ext("dir/a.tar.gz").as_deref(), Some("gz"));
        assert_eq!(ext(".bashrc"), None);
        assert_eq!(ext("README"), None);
    }

    #[test]
    fn source_is_not_serialized() {
        let record = FileRecord::from_bytes("a.txt", "text/plain", &b"hello"[..]);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("source").is_none());
        assert_eq!(json["originalname"], "a.txt");
    }
}
