//! Filename generation for new uploads.
//!
//! A generator turns an incoming record into the name it is stored under.
//! The `attempt` argument is reserved for retrying on name collisions; the
//! adapter currently always passes 0 and overwrites whatever is there.

use std::fmt;

use async_trait::async_trait;
use stowage_core::FileRecord;
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

const MAX_EXTENSION_LEN: usize = 16;

#[async_trait]
pub trait FilenameGenerator: Send + Sync {
    async fn generate(&self, record: &FileRecord, attempt: u32) -> StorageResult<String>;
}

/// Random hex name, keeping a clean extension of the original name.
///
/// The stored name never contains any part of the client-chosen name other
/// than its extension, so uploads cannot pick or overwrite a specific key.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomFilename;

#[async_trait]
impl FilenameGenerator for RandomFilename {
    async fn generate(&self, record: &FileRecord, _attempt: u32) -> StorageResult<String> {
        let stem = Uuid::new_v4().simple().to_string();
        Ok(match clean_extension(record) {
            Some(ext) => format!("{}.{}", stem, ext),
            None => stem,
        })
    }
}

/// Sanitized original name. Later attempts get a numeric suffix
/// (`photo.jpg`, `photo-1.jpg`, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginalFilename;

#[async_trait]
impl FilenameGenerator for OriginalFilename {
    async fn generate(&self, record: &FileRecord, attempt: u32) -> StorageResult<String> {
        let base = record.originalname.rsplit('/').next().unwrap_or_default();
        let (stem, ext) = match (base.rsplit_once('.'), clean_extension(record)) {
            (Some((stem, _)), Some(ext)) => (stem, Some(ext)),
            _ => (base, None),
        };

        let stem = sanitize(stem);
        if stem.is_empty() {
            return Err(StorageError::Naming(format!(
                "original name {:?} has no usable characters",
                record.originalname
            )));
        }

        let stem = if attempt > 0 {
            format!("{}-{}", stem, attempt)
        } else {
            stem
        };

        Ok(match ext {
            Some(ext) => format!("{}.{}", stem, ext),
            None => stem,
        })
    }
}

/// Adapts a plain closure into a `FilenameGenerator`.
pub struct FnFilename<F>(pub F);

impl<F> fmt::Debug for FnFilename<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnFilename")
    }
}

#[async_trait]
impl<F> FilenameGenerator for FnFilename<F>
where
    F: Fn(&FileRecord, u32) -> Result<String, String> + Send + Sync,
{
    async fn generate(&self, record: &FileRecord, attempt: u32) -> StorageResult<String> {
        (self.0)(record, attempt).map_err(StorageError::Naming)
    }
}

/// Lowercased extension of the original name, if it is short and alphanumeric.
fn clean_extension(record: &FileRecord) -> Option<String> {
    record
        .original_extension()
        .filter(|ext| ext.len() <= MAX_EXTENSION_LEN)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
}

fn sanitize(stem: &str) -> String {
    let replaced: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    replaced.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn record(originalname: &str) -> FileRecord {
        FileRecord::from_bytes(originalname, "application/octet-stream", Bytes::new())
    }

    #[tokio::test]
    async fn random_keeps_clean_extension() {
        let name = RandomFilename.generate(&record("Photo.JPG"), 0).await.unwrap();
        let (stem, ext) = name.split_once('.').unwrap();
        assert_eq!(stem.len(), 32);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(ext, "jpg");
    }

    #[tokio::test]
    async fn random_ignores_suspicious_extension() {
        let name = RandomFilename
            .generate(&record("evil.ph p/../x"), 0)
            .await
            .unwrap();
        assert!(!name.contains('.'));
        assert!(!name.contains('/'));
    }

    #[tokio::test]
    async fn random_names_differ() {
        let a = RandomFilename.generate(&record("a.txt"), 0).await.unwrap();
        let b = RandomFilename.generate(&record("a.txt"), 0).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn original_is_sanitized() {
        let name = OriginalFilename
            .generate(&record("my holiday (1).png"), 0)
            .await
            .unwrap();
        assert_eq!(name, "my-holiday--1.png");
    }

    #[tokio::test]
    async fn original_suffixes_later_attempts() {
        let name = OriginalFilename.generate(&record("a.txt"), 2).await.unwrap();
        assert_eq!(name, "a-2.txt");
    }

    #[tokio::test]
    async fn original_without_usable_characters_fails() {
        let result = OriginalFilename.generate(&record("...."), 0).await;
        assert!(matches!(result, Err(StorageError::Naming(_))));
    }

    #[tokio::test]
    async fn closure_errors_become_naming_errors() {
        let generator = FnFilename(|_: &FileRecord, _: u32| -> Result<String, String> {
            Err("no names today".to_string())
        });
        let result = generator.generate(&record("a.txt"), 0).await;
        assert!(matches!(result, Err(StorageError::Naming(msg)) if msg == "no names today"));

        let generator = FnFilename(|r: &FileRecord, attempt: u32| -> Result<String, String> {
            Ok(format!("{}-{}", r.size, attempt))
        });
        assert_eq!(generator.generate(&record("a.txt"), 0).await.unwrap(), "0-0");
    }
}
