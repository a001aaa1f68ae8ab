//! Remote object-storage client seam.
//!
//! The adapter speaks to the storage service through `ObjectClient`, a
//! bucket-scoped handle with put/head/delete semantics that reports results
//! as HTTP statuses and headers. `ObjectStoreClient` implements it over any
//! `object_store` backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{
    HeaderName, CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_ENCODING, CONTENT_LANGUAGE,
    CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED,
};
use http::{HeaderMap, HeaderValue, StatusCode};
use object_store::path::Path;
use object_store::{
    Attribute, AttributeValue, Attributes, Error as ObjectStoreError, ObjectMeta, ObjectStore,
    ObjectStoreExt, PutOptions, PutPayload,
};

use crate::keys::object_path;
use crate::traits::{StorageError, StorageResult};

const VERSION_ID: HeaderName = HeaderName::from_static("x-amz-version-id");
const METADATA_PREFIXES: [&str; 2] = ["x-amz-meta-", "x-oss-meta-"];

/// Status and headers returned by the storage service.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl RemoteResponse {
    pub fn new(status: StatusCode) -> Self {
        RemoteResponse {
            status,
            headers: HeaderMap::new(),
        }
    }

    pub fn with_headers(status: StatusCode, headers: HeaderMap) -> Self {
        RemoteResponse { status, headers }
    }

    /// Raw `ETag` header, exactly as the service sent it.
    pub fn etag(&self) -> Option<&str> {
        self.headers.get(ETAG).and_then(|v| v.to_str().ok())
    }
}

/// A storage client bound to exactly one bucket and credential set.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// The bucket every request of this handle targets.
    fn bucket(&self) -> &str;

    /// HTTPS URL of `key` inside this handle's bucket.
    fn https_url(&self, key: &str) -> String;

    /// Store `body` under `key`.
    async fn put(&self, key: &str, body: Bytes, headers: &HeaderMap)
        -> StorageResult<RemoteResponse>;

    /// Fetch an object's metadata without its body.
    async fn head(&self, key: &str) -> StorageResult<RemoteResponse>;

    async fn delete(&self, key: &str) -> StorageResult<RemoteResponse>;
}

/// How public object URLs are laid out for a bucket.
#[derive(Debug, Clone)]
pub struct BucketUrl {
    host: String,
    path_style: bool,
}

impl BucketUrl {
    /// `host` may carry a scheme; it is dropped since URLs are always HTTPS.
    pub fn new(host: &str, path_style: bool) -> Self {
        let host = host
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();
        BucketUrl { host, path_style }
    }

    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        let encoded: Vec<String> = object_path(key)
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        let encoded = encoded.join("/");

        if self.path_style {
            format!("https://{}/{}/{}", self.host, bucket, encoded)
        } else {
            format!("https://{}.{}/{}", bucket, self.host, encoded)
        }
    }
}

/// `ObjectClient` over an `object_store` backend.
///
/// PUTs may go through a separate handle on the same bucket whose requests
/// carry upload-only headers; HEAD and DELETE never see them.
#[derive(Debug, Clone)]
pub struct ObjectStoreClient {
    store: Arc<dyn ObjectStore>,
    upload_store: Option<Arc<dyn ObjectStore>>,
    bucket: String,
    url: BucketUrl,
}

impl ObjectStoreClient {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, url: BucketUrl) -> Self {
        ObjectStoreClient {
            store,
            upload_store: None,
            bucket: bucket.into(),
            url,
        }
    }

    /// Route PUTs through `store` instead of the shared handle.
    pub fn with_upload_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.upload_store = Some(store);
        self
    }

    #[cfg(test)]
    pub(crate) fn has_upload_store(&self) -> bool {
        self.upload_store.is_some()
    }

    fn location(key: &str) -> Path {
        Path::from(object_path(key))
    }
}

#[async_trait]
impl ObjectClient for ObjectStoreClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn https_url(&self, key: &str) -> String {
        self.url.object_url(&self.bucket, key)
    }

    async fn put(
        &self,
        key: &str,
        body: Bytes,
        headers: &HeaderMap,
    ) -> StorageResult<RemoteResponse> {
        if let Some(declared) = declared_length(headers) {
            if declared != body.len() as u64 {
                tracing::warn!(
                    bucket = %self.bucket,
                    key = %key,
                    declared_bytes = declared,
                    actual_bytes = body.len(),
                    "Content-Length does not match body, refusing to send"
                );
                return Ok(RemoteResponse::new(StatusCode::BAD_REQUEST));
            }
        }

        let mut opts = PutOptions::default();
        opts.attributes = put_attributes(headers);

        let location = Self::location(key);
        let store = self.upload_store.as_ref().unwrap_or(&self.store);
        match store
            .put_opts(&location, PutPayload::from(body), opts)
            .await
        {
            Ok(result) => {
                let mut headers = HeaderMap::new();
                insert_str(&mut headers, ETAG, result.e_tag.as_deref());
                insert_str(&mut headers, VERSION_ID, result.version.as_deref());
                Ok(RemoteResponse::with_headers(StatusCode::OK, headers))
            }
            Err(e) => answered(e),
        }
    }

    async fn head(&self, key: &str) -> StorageResult<RemoteResponse> {
        let location = Self::location(key);
        match self.store.head(&location).await {
            Ok(meta) => Ok(RemoteResponse::with_headers(
                StatusCode::OK,
                meta_headers(&meta),
            )),
            Err(e) => answered(e),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<RemoteResponse> {
        let location = Self::location(key);
        match self.store.delete(&location).await {
            Ok(()) => Ok(RemoteResponse::new(StatusCode::NO_CONTENT)),
            Err(e) => answered(e),
        }
    }
}

/// Errors that are the service's answer become statuses; everything else is
/// a transport failure and is passed through.
fn answered(err: ObjectStoreError) -> StorageResult<RemoteResponse> {
    let status = match err {
        ObjectStoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        ObjectStoreError::AlreadyExists { .. } => StatusCode::CONFLICT,
        ObjectStoreError::Precondition { .. } => StatusCode::PRECONDITION_FAILED,
        ObjectStoreError::NotModified { .. } => StatusCode::NOT_MODIFIED,
        ObjectStoreError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
        ObjectStoreError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
        _ => return Err(err.into()),
    };
    tracing::debug!(error = %err, status = %status, "Object store answered with error status");
    Ok(RemoteResponse::new(status))
}

/// Parse configured header overrides.
pub(crate) fn parse_headers(headers: &HashMap<String, String>) -> StorageResult<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| StorageError::Configuration(format!("invalid header name {:?}", name)))?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            StorageError::Configuration(format!("invalid value for header {}", name))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Translate request headers into object attributes. Headers without an
/// attribute counterpart are left to the upload handle's default headers.
fn put_attributes(headers: &HeaderMap) -> Attributes {
    let mut attributes = Attributes::new();

    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            tracing::debug!(header = %name, "Skipping non-ASCII header value");
            continue;
        };

        let attribute = if *name == CONTENT_TYPE {
            Attribute::ContentType
        } else if *name == CACHE_CONTROL {
            Attribute::CacheControl
        } else if *name == CONTENT_DISPOSITION {
            Attribute::ContentDisposition
        } else if *name == CONTENT_ENCODING {
            Attribute::ContentEncoding
        } else if *name == CONTENT_LANGUAGE {
            Attribute::ContentLanguage
        } else if let Some(meta) = metadata_key(name.as_str()) {
            Attribute::Metadata(meta.to_string().into())
        } else {
            continue;
        };

        attributes.insert(attribute, AttributeValue::from(value.to_string()));
    }

    attributes
}

/// User metadata key for `x-amz-meta-*` / `x-oss-meta-*` headers.
fn metadata_key(name: &str) -> Option<&str> {
    METADATA_PREFIXES
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
        .filter(|key| !key.is_empty())
}

/// Whether a header is carried per request as an object attribute.
pub(crate) fn is_attribute_header(name: &HeaderName) -> bool {
    *name == CONTENT_TYPE
        || *name == CONTENT_LENGTH
        || *name == CACHE_CONTROL
        || *name == CONTENT_DISPOSITION
        || *name == CONTENT_ENCODING
        || *name == CONTENT_LANGUAGE
        || metadata_key(name.as_str()).is_some()
}

fn meta_headers(meta: &ObjectMeta) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_LENGTH, HeaderValue::from(meta.size));
    let last_modified = meta
        .last_modified
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();
    insert_str(&mut headers, LAST_MODIFIED, Some(&last_modified));
    insert_str(&mut headers, ETAG, meta.e_tag.as_deref());
    insert_str(&mut headers, VERSION_ID, meta.version.as_deref());
    headers
}

fn insert_str(headers: &mut HeaderMap, name: HeaderName, value: Option<&str>) {
    if let Some(value) = value.and_then(|v| HeaderValue::from_str(v).ok()) {
        headers.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn client() -> ObjectStoreClient {
        ObjectStoreClient::new(
            Arc::new(InMemory::new()),
            "b1",
            BucketUrl::new("s3.us-east-1.amazonaws.com", false),
        )
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[tokio::test]
    async fn put_then_head_reports_metadata() {
        let client = client();
        let put = client
            .put(
                "/uploads/a.txt",
                Bytes::from_static(b"hello"),
                &headers(&[("content-type", "text/plain"), ("content-length", "5")]),
            )
            .await
            .unwrap();
        assert_eq!(put.status, StatusCode::OK);
        assert!(put.etag().is_some());

        let head = client.head("/uploads/a.txt").await.unwrap();
        assert_eq!(head.status, StatusCode::OK);
        assert_eq!(head.headers.get(CONTENT_LENGTH).unwrap(), "5");
        assert!(head.headers.contains_key(LAST_MODIFIED));
    }

    #[tokio::test]
    async fn head_missing_object_is_404() {
        let head = client().head("/nope.txt").await.unwrap();
        assert_eq!(head.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_is_204() {
        let client = client();
        client
            .put("/a.txt", Bytes::from_static(b"x"), &HeaderMap::new())
            .await
            .unwrap();
        let deleted = client.delete("/a.txt").await.unwrap();
        assert_eq!(deleted.status, StatusCode::NO_CONTENT);
        assert_eq!(client.head("/a.txt").await.unwrap().status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn mismatched_content_length_is_rejected_without_sending() {
        let client = client();
        let put = client
            .put(
                "/a.txt",
                Bytes::from_static(b"hello"),
                &headers(&[("content-length", "12")]),
            )
            .await
            .unwrap();
        assert_eq!(put.status, StatusCode::BAD_REQUEST);
        assert_eq!(client.head("/a.txt").await.unwrap().status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn puts_use_upload_store_when_set() {
        let shared = Arc::new(InMemory::new());
        let upload = Arc::new(InMemory::new());
        let client = ObjectStoreClient::new(
            shared.clone(),
            "b1",
            BucketUrl::new("s3.us-east-1.amazonaws.com", false),
        )
        .with_upload_store(upload.clone());

        let put = client
            .put("/a.txt", Bytes::from_static(b"x"), &HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(put.status, StatusCode::OK);

        assert!(upload.head(&Path::from("a.txt")).await.is_ok());
        // HEAD goes through the shared handle.
        assert_eq!(client.head("/a.txt").await.unwrap().status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn attributes_from_headers() {
        let attributes = put_attributes(&headers(&[
            ("content-type", "text/plain"),
            ("cache-control", "max-age=60"),
            ("x-amz-meta-owner", "alice"),
            ("x-amz-acl", "public-read"),
            ("content-length", "5"),
        ]));

        assert_eq!(attributes.len(), 3);
        assert_eq!(
            attributes.get(&Attribute::ContentType).map(|v| v.as_ref()),
            Some("text/plain")
        );
        assert_eq!(
            attributes
                .get(&Attribute::Metadata("owner".into()))
                .map(|v| v.as_ref()),
            Some("alice")
        );
    }

    #[test]
    fn parse_headers_rejects_bad_names() {
        let mut raw = HashMap::new();
        raw.insert("bad header".to_string(), "x".to_string());
        assert!(matches!(
            parse_headers(&raw),
            Err(StorageError::Configuration(_))
        ));

        let mut raw = HashMap::new();
        raw.insert("X-Amz-Acl".to_string(), "public-read".to_string());
        let map = parse_headers(&raw).unwrap();
        assert_eq!(map.get("x-amz-acl").unwrap(), "public-read");
    }

    #[test]
    fn acl_header_is_not_an_attribute() {
        assert!(!is_attribute_header(&HeaderName::from_static("x-amz-acl")));
        assert!(is_attribute_header(&HeaderName::from_static("x-oss-meta-owner")));
        assert!(is_attribute_header(&CONTENT_TYPE));
    }

    #[test]
    fn virtual_hosted_url() {
        let url = BucketUrl::new("https://oss-cn-hangzhou.aliyuncs.com/", false);
        assert_eq!(
            url.object_url("b1", "/uploads/my file.txt"),
            "https://b1.oss-cn-hangzhou.aliyuncs.com/uploads/my%20file.txt"
        );
    }

    #[test]
    fn path_style_url() {
        let url = BucketUrl::new("http://localhost:9000", true);
        assert_eq!(
            url.object_url("b1", "/a.txt"),
            "https://localhost:9000/b1/a.txt"
        );
    }
}
