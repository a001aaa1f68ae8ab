//! Configuration module
//!
//! Adapter configuration is an explicit value handed to the adapter at
//! construction time. `OssConfig::from_env` exists for binaries that want the
//! conventional `OSS_*` variables, but nothing in the library reads the
//! process environment on its own.

use std::collections::HashMap;
use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

const DEFAULT_REGION: &str = "us-east-1";

/// Pre-resolved credentials for the object-storage service.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub key: Option<String>,
    pub secret: Option<String>,
    /// Session token for temporary credentials.
    #[serde(default)]
    pub token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Object-storage adapter configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OssConfig {
    /// Default bucket. New uploads always land here.
    pub bucket: String,
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible providers
    /// (e.g. "oss-cn-hangzhou.aliyuncs.com", "https://nyc3.digitaloceanspaces.com").
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Static headers sent with every upload. `defaultHeaders` is accepted as
    /// an older spelling.
    #[serde(default, alias = "defaultHeaders")]
    pub headers: HashMap<String, String>,
    /// Directory prefix inside the bucket. Must be absolute when set.
    #[serde(default)]
    pub path: Option<String>,
    /// Use `https://{host}/{bucket}/{key}` URLs instead of
    /// `https://{bucket}.{host}/{key}`.
    #[serde(default)]
    pub path_style: bool,
}

impl OssConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        OssConfig {
            bucket: bucket.into(),
            credentials: Credentials::default(),
            region: None,
            endpoint: None,
            headers: HashMap::new(),
            path: None,
            path_style: false,
        }
    }

    pub fn with_credentials(mut self, key: impl Into<String>, secret: impl Into<String>) -> Self {
        self.credentials.key = Some(key.into());
        self.credentials.secret = Some(secret.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_path_style(mut self, path_style: bool) -> Self {
        self.path_style = path_style;
        self
    }

    /// Load configuration from `OSS_*` environment variables (and `.env`).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let bucket = env::var("OSS_BUCKET")
            .map_err(|_| anyhow::anyhow!("OSS_BUCKET must be set"))?;

        let config = OssConfig {
            bucket,
            credentials: Credentials {
                key: env::var("OSS_KEY").ok(),
                secret: env::var("OSS_SECRET").ok(),
                token: env::var("OSS_TOKEN").ok(),
            },
            region: env::var("OSS_REGION").ok(),
            endpoint: env::var("OSS_ENDPOINT").ok(),
            headers: HashMap::new(),
            path: env::var("OSS_PATH").ok(),
            path_style: env::var("OSS_PATH_STYLE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.bucket.trim().is_empty() {
            return Err(anyhow::anyhow!("OSS bucket must not be empty"));
        }

        if let Some(ref path) = self.path {
            if !path.starts_with('/') {
                return Err(anyhow::anyhow!(
                    "OSS path must be absolute, got {:?}",
                    path
                ));
            }
        }

        if self.credentials.key.is_some() != self.credentials.secret.is_some() {
            return Err(anyhow::anyhow!(
                "OSS key and secret must be provided together"
            ));
        }

        Ok(())
    }

    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_is_rejected() {
        let config = OssConfig::new("b1").with_path("relative/dir");
        assert!(config.validate().is_err());
    }

    #[test]
    fn absolute_path_is_accepted() {
        let config = OssConfig::new("b1").with_path("/uploads");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_bucket_is_rejected() {
        assert!(OssConfig::new("  ").validate().is_err());
    }

    #[test]
    fn key_without_secret_is_rejected() {
        let mut config = OssConfig::new("b1");
        config.credentials.key = Some("AKID".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_headers_alias() {
        let config: OssConfig = serde_json::from_value(serde_json::json!({
            "bucket": "b1",
            "key": "AKID",
            "secret": "shh",
            "defaultHeaders": { "x-amz-acl": "public-read" }
        }))
        .unwrap();

        assert_eq!(config.headers.get("x-amz-acl").unwrap(), "public-read");
        assert_eq!(config.credentials.key.as_deref(), Some("AKID"));
        assert_eq!(config.region(), "us-east-1");
    }

    #[test]
    fn debug_redacts_secret() {
        let config = OssConfig::new("b1").with_credentials("AKID", "topsecret");
        let out = format!("{:?}", config);
        assert!(out.contains("AKID"));
        assert!(!out.contains("topsecret"));
    }
}
