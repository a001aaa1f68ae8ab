//! Schema extension fields.
//!
//! The adapter annotates records with `filename`, `bucket`, `path` and `etag`.
//! Which of them the framework actually persists is a per-collection choice.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::FileRecord;

/// Storage adapter API revision understood by the calling framework.
pub const COMPATIBILITY_LEVEL: u32 = 1;

/// Every extra field the adapter can populate.
pub const SCHEMA_TYPES: [&str; 4] = ["filename", "bucket", "path", "etag"];

/// Which adapter-populated fields get persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaFields {
    pub filename: bool,
    pub bucket: bool,
    pub path: bool,
    pub etag: bool,
}

impl Default for SchemaFields {
    fn default() -> Self {
        SchemaFields {
            filename: true,
            bucket: false,
            path: false,
            etag: false,
        }
    }
}

impl SchemaFields {
    pub fn all() -> Self {
        SchemaFields {
            filename: true,
            bucket: true,
            path: true,
            etag: true,
        }
    }

    /// Project the enabled fields of `record`. Unset values become `null`.
    pub fn persisted(&self, record: &FileRecord) -> Map<String, Value> {
        let mut out = Map::new();
        let fields = [
            (self.filename, "filename", &record.filename),
            (self.bucket, "bucket", &record.bucket),
            (self.path, "path", &record.path),
            (self.etag, "etag", &record.etag),
        ];
        for (enabled, name, value) in fields {
            if enabled {
                out.insert(name.to_string(), Value::from(value.clone()));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_only_persist_filename() {
        let mut record = FileRecord::named("abc.txt");
        record.bucket = Some("b1".to_string());

        let map = SchemaFields::default().persisted(&record);
        assert_eq!(map.len(), 1);
        assert_eq!(map["filename"], "abc.txt");
    }

    #[test]
    fn unset_fields_are_null() {
        let map = SchemaFields::all().persisted(&FileRecord::named("abc.txt"));
        assert_eq!(map.len(), SCHEMA_TYPES.len());
        assert!(map["etag"].is_null());
    }

    #[test]
    fn partial_schema_deserializes_with_defaults() {
        let fields: SchemaFields = serde_json::from_str(r#"{"etag": true}"#).unwrap();
        assert!(fields.filename);
        assert!(fields.etag);
        assert!(!fields.bucket);
    }
}
