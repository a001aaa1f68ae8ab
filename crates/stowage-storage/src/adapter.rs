//! Object-storage file adapter.
//!
//! Maps file records onto objects: generates names for new uploads, resolves
//! keys, routes each record to the client for its bucket and commits remote
//! results back onto the record.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use stowage_core::{FileRecord, LocalSource, OssConfig};
use tokio::fs;

use crate::client::{parse_headers, ObjectClient};
use crate::factory::ClientFactory;
use crate::keys::resolve_key;
use crate::naming::{FilenameGenerator, RandomFilename};
use crate::traits::{FileAdapter, StorageError, StorageResult};

/// File adapter backed by an S3-compatible object store.
pub struct OssAdapter {
    config: OssConfig,
    headers: HeaderMap,
    /// Handle for `config.bucket`, shared by all operations.
    client: Arc<dyn ObjectClient>,
    factory: Arc<dyn ClientFactory>,
    generate_filename: Arc<dyn FilenameGenerator>,
}

pub struct OssAdapterBuilder {
    config: OssConfig,
    generate_filename: Arc<dyn FilenameGenerator>,
    factory: Option<Arc<dyn ClientFactory>>,
}

impl OssAdapterBuilder {
    pub fn filename_generator(mut self, generator: impl FilenameGenerator + 'static) -> Self {
        self.generate_filename = Arc::new(generator);
        self
    }

    pub fn client_factory(mut self, factory: Arc<dyn ClientFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Validate the configuration and build the default-bucket client.
    pub fn build(self) -> StorageResult<OssAdapter> {
        self.config
            .validate()
            .map_err(|e| StorageError::Configuration(e.to_string()))?;

        let headers = parse_headers(&self.config.headers)?;

        let factory = match self.factory {
            Some(factory) => factory,
            None => default_factory(&self.config)?,
        };
        let client = factory.client_for_bucket(&self.config.bucket)?;

        tracing::debug!(
            bucket = %self.config.bucket,
            path = ?self.config.path,
            "OSS adapter configured"
        );

        Ok(OssAdapter {
            config: self.config,
            headers,
            client,
            factory,
            generate_filename: self.generate_filename,
        })
    }
}

#[cfg(feature = "storage-s3")]
fn default_factory(config: &OssConfig) -> StorageResult<Arc<dyn ClientFactory>> {
    Ok(Arc::new(crate::factory::S3ClientFactory::new(config.clone())?))
}

#[cfg(not(feature = "storage-s3"))]
fn default_factory(_config: &OssConfig) -> StorageResult<Arc<dyn ClientFactory>> {
    Err(StorageError::Configuration(
        "no client factory given and storage-s3 feature not enabled".to_string(),
    ))
}

impl OssAdapter {
    pub fn builder(config: OssConfig) -> OssAdapterBuilder {
        OssAdapterBuilder {
            config,
            generate_filename: Arc::new(RandomFilename),
            factory: None,
        }
    }

    /// Adapter with the S3 client factory and random filenames.
    pub fn new(config: OssConfig) -> StorageResult<Self> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &OssConfig {
        &self.config
    }

    /// Absolute storage key of `record`.
    pub fn resolve(&self, record: &FileRecord) -> StorageResult<String> {
        resolve_key(record, self.config.path.as_deref())
    }

    /// Client for the bucket `record` lives in.
    pub fn client_for(&self, record: &FileRecord) -> StorageResult<Arc<dyn ObjectClient>> {
        match record.bucket.as_deref() {
            Some(bucket) if bucket != self.config.bucket => {
                tracing::debug!(bucket = %bucket, "Building client for non-default bucket");
                self.factory.client_for_bucket(bucket)
            }
            _ => Ok(Arc::clone(&self.client)),
        }
    }

    /// Configured headers with the computed `Content-Length` and
    /// `Content-Type` on top; the computed values describe the actual body
    /// and always win.
    fn upload_headers(&self, record: &FileRecord) -> StorageResult<HeaderMap> {
        let mut headers = self.headers.clone();
        headers.insert(CONTENT_LENGTH, HeaderValue::from(record.size));
        let content_type = HeaderValue::from_str(&record.mimetype)
            .map_err(|_| StorageError::InvalidHeader(format!("mimetype {:?}", record.mimetype)))?;
        headers.insert(CONTENT_TYPE, content_type);
        Ok(headers)
    }
}

async fn read_source(record: &FileRecord) -> StorageResult<Bytes> {
    match record.source {
        Some(LocalSource::Path(ref path)) => Ok(Bytes::from(fs::read(path).await?)),
        Some(LocalSource::Bytes(ref bytes)) => Ok(bytes.clone()),
        None => Err(StorageError::MissingSource),
    }
}

/// Strip the quotes S3-style services wrap entity tags in.
///
/// Exactly one enclosing pair is removed. A weak validator keeps its `W/`
/// prefix: `W/"abc"` becomes `W/abc`.
pub fn normalize_etag(etag: &str) -> String {
    let etag = etag.trim();
    let (weak, tag) = match etag.strip_prefix("W/") {
        Some(tag) => (true, tag),
        None => (false, etag),
    };
    let tag = tag
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(tag);

    if weak {
        format!("W/{}", tag)
    } else {
        tag.to_string()
    }
}

#[async_trait]
impl FileAdapter for OssAdapter {
    async fn upload_file(&self, record: &mut FileRecord) -> StorageResult<()> {
        let filename = self
            .generate_filename
            .generate(record, 0)
            .await
            .map_err(|e| match e {
                StorageError::Naming(_) => e,
                other => StorageError::Naming(other.to_string()),
            })?;

        // Work on a copy; the caller's record only changes once the PUT succeeded.
        let mut staged = record.clone();
        staged.filename = Some(filename.clone());
        staged.path = self.config.path.clone();
        staged.bucket = Some(self.config.bucket.clone());

        let key = self.resolve(&staged)?;
        let headers = self.upload_headers(&staged)?;
        let client = self.client_for(&staged)?;
        let body = read_source(&staged).await?;
        let size = body.len();

        tracing::debug!(filename = %filename, key = %key, "Uploading file");
        let start = Instant::now();

        let response = client.put(&key, body, &headers).await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %client.bucket(),
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "OSS upload failed"
            );
            e
        })?;

        if response.status != StatusCode::OK {
            tracing::error!(
                status = %response.status,
                bucket = %client.bucket(),
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "OSS upload rejected"
            );
            return Err(StorageError::Upload {
                key,
                status: response.status,
            });
        }

        let etag = match response.etag().map(normalize_etag) {
            Some(etag) if !etag.is_empty() => etag,
            _ => {
                tracing::error!(
                    bucket = %client.bucket(),
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "OSS upload answered without an ETag"
                );
                return Err(StorageError::MissingEtag { key });
            }
        };
        staged.etag = Some(etag);

        tracing::info!(
            bucket = %client.bucket(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "OSS upload successful"
        );

        *record = staged;
        Ok(())
    }

    async fn remove_file(&self, record: &FileRecord) -> StorageResult<()> {
        let key = self.resolve(record)?;
        let client = self.client_for(record)?;
        let start = Instant::now();

        let response = client.delete(&key).await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %client.bucket(),
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "OSS delete failed"
            );
            e
        })?;

        // Deletes answer 204, but 200 is accepted too.
        let status = response.status;
        if status != StatusCode::OK && status != StatusCode::NO_CONTENT {
            tracing::error!(
                status = %status,
                bucket = %client.bucket(),
                key = %key,
                "OSS delete rejected"
            );
            return Err(StorageError::Deletion { key, status });
        }

        tracing::info!(
            bucket = %client.bucket(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "OSS delete successful"
        );
        Ok(())
    }

    async fn file_exists(&self, filename: &str) -> StorageResult<Option<HeaderMap>> {
        let key = self.resolve(&FileRecord::named(filename))?;
        let start = Instant::now();

        let response = self.client.head(&key).await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.client.bucket(),
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "OSS existence check failed"
            );
            e
        })?;

        let status = response.status;
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(bucket = %self.client.bucket(), key = %key, "Object not found");
            return Ok(None);
        }
        if !status.is_success() {
            tracing::error!(
                status = %status,
                bucket = %self.client.bucket(),
                key = %key,
                "OSS existence check rejected"
            );
            return Err(StorageError::ExistenceCheck { key, status });
        }

        tracing::debug!(
            bucket = %self.client.bucket(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object exists"
        );
        Ok(Some(response.headers))
    }

    fn file_url(&self, record: &FileRecord) -> StorageResult<String> {
        let key = self.resolve(record)?;
        Ok(self.client_for(record)?.https_url(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn etag_quotes_are_stripped() {
        assert_eq!(
            normalize_etag("\"d41d8cd98f00b204e9800998ecf8427e\""),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(normalize_etag("abc"), "abc");
        assert_eq!(normalize_etag(" \"abc\" "), "abc");
    }

    #[test]
    fn weak_etag_keeps_prefix_and_balanced_quotes() {
        assert_eq!(normalize_etag("W/\"abc\""), "W/abc");
        assert_eq!(normalize_etag("\"\"abc\"\""), "\"abc\"");
        // An unterminated quote is left alone.
        assert_eq!(normalize_etag("\"abc"), "\"abc");
    }

    #[tokio::test]
    async fn missing_source_is_reported() {
        let record = FileRecord::named("a.txt");
        assert!(matches!(
            read_source(&record).await,
            Err(StorageError::MissingSource)
        ));
    }

    #[tokio::test]
    async fn reads_source_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.bin");
        tokio::fs::write(&path, b"on disk").await.unwrap();

        let record = FileRecord::new(
            "a.bin",
            "application/octet-stream",
            7,
            LocalSource::Path(path),
        );
        assert_eq!(
            read_source(&record).await.unwrap(),
            Bytes::from_static(b"on disk")
        );
    }
}
