//! Object-store client for S3-compatible backends (MinIO in the reference
//! deployment).
//!
//! The rest of the crate talks to the store exclusively through the
//! [`ObjectStore`] trait, so tests can substitute an in-memory implementation
//! and the real client can be constructed once in `main` and handed to every
//! flow (no global state, no memoised singletons).

use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};
use thiserror::Error;

/// Connection settings for the object store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Custom endpoint URL (`MinIO`); `None` targets AWS S3 proper.
    pub endpoint: Option<String>,

    /// Region name. `MinIO` accepts any value; "us-east-1" is its default.
    pub region: String,

    /// Access key ID.
    pub access_key: String,

    /// Secret access key.
    pub secret_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: Some("http://localhost:9000".to_string()),
            region: "us-east-1".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
        }
    }
}

impl StoreConfig {
    /// Build the connection settings from the deployment's environment
    /// variables.
    ///
    /// Host resolution order: `MINIO_HOST`, then `APP_HOST`, then
    /// `localhost`; the store always listens on port 9000 over plain HTTP
    /// inside the compose network. Credentials come from `MINIO_ROOT_USER` /
    /// `MINIO_ROOT_PASSWORD`, both defaulting to `minioadmin`.
    pub fn from_env() -> Self {
        let host = std::env::var("MINIO_HOST")
            .or_else(|_| std::env::var("APP_HOST"))
            .unwrap_or_else(|_| "localhost".to_string());
        Self {
            endpoint: Some(format!("http://{host}:9000")),
            region: "us-east-1".to_string(),
            access_key: std::env::var("MINIO_ROOT_USER")
                .unwrap_or_else(|_| "minioadmin".to_string()),
            secret_key: std::env::var("MINIO_ROOT_PASSWORD")
                .unwrap_or_else(|_| "minioadmin".to_string()),
        }
    }
}

/// Errors surfaced by [`ObjectStore`] implementations.
///
/// The transfer layer decides what these mean: inside a batch they become
/// [`crate::transfer::TransferFailure`] records; on the single-object paths
/// they are promoted to fatal [`crate::error::DocPrepError`] variants.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Any other request failure (connection, auth, server error).
    #[error("{0}")]
    Request(String),
}

/// Minimal object-store surface the flows need.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List object keys in `bucket`. With `recursive` set, keys under every
    /// prefix are returned; otherwise listing stops at the first delimiter.
    async fn list(&self, bucket: &str, recursive: bool) -> Result<Vec<String>, StoreError>;

    /// Fetch one object's full content.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Store one object with an explicit content type.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError>;
}

/// [`ObjectStore`] backed by the AWS S3 SDK.
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Build a client from the given settings.
    ///
    /// With an explicit endpoint the client switches to path-style bucket
    /// addressing, which `MinIO` requires.
    pub fn new(config: StoreConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "docprep",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region))
            .behavior_version_latest();

        if let Some(endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list(&self, bucket: &str, recursive: bool) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        // list_objects_v2 pages at 1000 keys; follow continuation tokens so
        // large buckets list completely.
        loop {
            let mut request = self.client.list_objects_v2().bucket(bucket);
            if !recursive {
                request = request.delimiter("/");
            }
            if let Some(token) = &continuation {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| StoreError::Request(e.to_string()))?;

            keys.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(ToString::to_string)),
            );

            match response.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        Ok(keys)
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StoreError::NotFound(key.to_string())
                } else {
                    StoreError::Request(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let length = data.len();

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .content_length(length as i64)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_local_minio() {
        let config = StoreConfig::default();
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.access_key, "minioadmin");
        assert_eq!(config.secret_key, "minioadmin");
    }

    #[test]
    fn from_env_prefers_minio_host() {
        std::env::set_var("MINIO_HOST", "store.internal");
        let config = StoreConfig::from_env();
        std::env::remove_var("MINIO_HOST");
        assert_eq!(
            config.endpoint.as_deref(),
            Some("http://store.internal:9000")
        );
    }

    #[test]
    fn client_builds_with_custom_endpoint() {
        // Constructing the client must not require a live endpoint.
        let _store = S3ObjectStore::new(StoreConfig {
            endpoint: Some("http://localhost:9000".to_string()),
            ..StoreConfig::default()
        });
    }

    #[test]
    fn not_found_display_names_key() {
        let e = StoreError::NotFound("annotations/a.json".to_string());
        assert!(e.to_string().contains("annotations/a.json"));
    }
}
