use std::sync::Arc;

#[cfg(feature = "storage-s3")]
use http::HeaderMap;
use stowage_core::OssConfig;

use crate::client::ObjectClient;
#[cfg(feature = "storage-s3")]
use crate::client::parse_headers;
use crate::{FileAdapter, OssAdapter, StorageResult};
#[cfg(not(feature = "storage-s3"))]
use crate::StorageError;

/// Builds bucket-scoped clients on demand.
///
/// The adapter asks once for its default bucket and keeps that handle. Every
/// request for another bucket gets a fresh, uncached handle.
pub trait ClientFactory: Send + Sync {
    fn client_for_bucket(&self, bucket: &str) -> StorageResult<Arc<dyn ObjectClient>>;
}

/// Client factory for S3-compatible services.
#[cfg(feature = "storage-s3")]
#[derive(Debug, Clone)]
pub struct S3ClientFactory {
    config: OssConfig,
    headers: HeaderMap,
}

#[cfg(feature = "storage-s3")]
impl S3ClientFactory {
    pub fn new(config: OssConfig) -> StorageResult<Self> {
        let headers = parse_headers(&config.headers)?;
        Ok(S3ClientFactory { config, headers })
    }
}

#[cfg(feature = "storage-s3")]
impl ClientFactory for S3ClientFactory {
    fn client_for_bucket(&self, bucket: &str) -> StorageResult<Arc<dyn ObjectClient>> {
        let client = crate::s3::s3_client(&self.config, bucket, &self.headers)?;
        Ok(Arc::new(client))
    }
}

/// Create the default adapter for a configuration
#[cfg(feature = "storage-s3")]
pub fn create_adapter(config: OssConfig) -> StorageResult<Arc<dyn FileAdapter>> {
    let factory = S3ClientFactory::new(config.clone())?;
    let adapter = OssAdapter::builder(config)
        .client_factory(Arc::new(factory))
        .build()?;
    Ok(Arc::new(adapter))
}

#[cfg(not(feature = "storage-s3"))]
pub fn create_adapter(_config: OssConfig) -> StorageResult<Arc<dyn FileAdapter>> {
    Err(StorageError::Configuration(
        "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
    ))
}
