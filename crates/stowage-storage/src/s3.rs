//! S3-compatible bucket handles (AWS S3, Alibaba OSS, MinIO, DigitalOcean Spaces).

use std::sync::Arc;

use http::HeaderMap;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::ClientOptions;
use stowage_core::OssConfig;

use crate::client::{is_attribute_header, BucketUrl, ObjectStoreClient};
use crate::traits::{StorageError, StorageResult};

/// Build a client for `bucket` using every other setting from `config`.
///
/// `headers` are the configured upload headers. Those that cannot travel as
/// object attributes (e.g. `x-amz-acl`) are installed as default headers of a
/// second handle used only for PUTs, so HEAD and DELETE requests stay plain.
pub fn s3_client(
    config: &OssConfig,
    bucket: &str,
    headers: &HeaderMap,
) -> StorageResult<ObjectStoreClient> {
    let region = config.region();
    let mut builder = AmazonS3Builder::new()
        .with_bucket_name(bucket)
        .with_region(region)
        .with_virtual_hosted_style_request(!config.path_style);

    if let Some(ref endpoint) = config.endpoint {
        builder = builder
            .with_endpoint(endpoint_url(endpoint, bucket, config.path_style))
            .with_allow_http(endpoint.starts_with("http://"));
    }

    if let Some(ref key) = config.credentials.key {
        builder = builder.with_access_key_id(key);
    }
    if let Some(ref secret) = config.credentials.secret {
        builder = builder.with_secret_access_key(secret);
    }
    if let Some(ref token) = config.credentials.token {
        builder = builder.with_token(token);
    }

    let mut upload_headers = HeaderMap::new();
    for (name, value) in headers {
        if !is_attribute_header(name) {
            upload_headers.append(name.clone(), value.clone());
        }
    }

    let url = BucketUrl::new(&public_host(config), config.path_style);
    let store = build_store(builder.clone(), bucket)?;
    let mut client = ObjectStoreClient::new(Arc::new(store), bucket, url);

    if !upload_headers.is_empty() {
        let upload = build_store(
            builder.with_client_options(ClientOptions::new().with_default_headers(upload_headers)),
            bucket,
        )?;
        client = client.with_upload_store(Arc::new(upload));
    }

    Ok(client)
}

fn build_store(builder: AmazonS3Builder, bucket: &str) -> StorageResult<AmazonS3> {
    builder.build().map_err(|e| {
        tracing::error!(error = %e, bucket = %bucket, "Failed to build S3 client");
        StorageError::Configuration(e.to_string())
    })
}

/// Host used in public object URLs.
///
/// For AWS S3 this is `s3.{region}.amazonaws.com`; for S3-compatible
/// providers the configured endpoint.
pub fn public_host(config: &OssConfig) -> String {
    match config.endpoint {
        Some(ref endpoint) => endpoint.clone(),
        None => format!("s3.{}.amazonaws.com", config.region()),
    }
}

/// Request endpoint for `bucket`. Virtual-hosted requests need the bucket in
/// the host name; path-style requests use the endpoint as is.
fn endpoint_url(endpoint: &str, bucket: &str, path_style: bool) -> String {
    let (scheme, host) = match endpoint.split_once("://") {
        Some((scheme, host)) => (scheme, host),
        None => ("https", endpoint),
    };
    let host = host.trim_end_matches('/');

    if path_style {
        format!("{}://{}", scheme, host)
    } else {
        format!("{}://{}.{}", scheme, bucket, host)
    }
}
