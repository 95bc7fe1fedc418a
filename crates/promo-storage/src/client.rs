//! S3-compatible blob client.

use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use tracing::{debug, info, warn};

use promo_models::ArtifactMeta;

use crate::error::{StorageError, StorageResult};

/// Configuration for the blob client.
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// S3 API endpoint URL
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// Region (usually "auto" for R2)
    pub region: String,
    /// Public base URL for objects; presigned URLs are used when unset
    pub public_base_url: Option<String>,
    /// Key prefix for every stored artifact
    pub prefix: String,
    /// Lifetime of presigned URLs
    pub presign_ttl: Duration,
}

impl BlobConfig {
    /// Create config from environment variables.
    ///
    /// Returns a config error when any credential is missing; callers treat
    /// that as "blob storage disabled".
    pub fn from_env() -> StorageResult<Self> {
        let required = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| StorageError::config_error(format!("{} not set", name)))
        };

        Ok(Self {
            endpoint_url: required("BLOB_ENDPOINT_URL")?,
            access_key_id: required("BLOB_ACCESS_KEY_ID")?,
            secret_access_key: required("BLOB_SECRET_ACCESS_KEY")?,
            bucket_name: required("BLOB_BUCKET_NAME")?,
            region: std::env::var("BLOB_REGION").unwrap_or_else(|_| "auto".to_string()),
            public_base_url: std::env::var("BLOB_PUBLIC_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            prefix: std::env::var("BLOB_PREFIX").unwrap_or_else(|_| "promo".to_string()),
            presign_ttl: Duration::from_secs(
                std::env::var("BLOB_PRESIGN_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(7 * 24 * 3600),
            ),
        })
    }
}

/// A stored artifact's location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

/// Blob storage client.
#[derive(Clone)]
pub struct BlobStore {
    client: Client,
    bucket: String,
    public_base_url: Option<String>,
    prefix: String,
    presign_ttl: Duration,
}

impl BlobStore {
    pub async fn new(config: BlobConfig) -> StorageResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "blob",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            public_base_url: config
                .public_base_url
                .map(|u| u.trim_end_matches('/').to_string()),
            prefix: config.prefix.trim_matches('/').to_string(),
            presign_ttl: config.presign_ttl,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        Self::new(BlobConfig::from_env()?).await
    }

    /// Object key for an artifact.
    pub fn artifact_key(&self, meta: &ArtifactMeta) -> String {
        let folder = if meta.format.is_motion() { "videos" } else { "cards" };
        let file_name = meta
            .file_name
            .clone()
            .unwrap_or_else(|| meta.suggested_file_name());
        self.key(&format!("{}/{}", folder, file_name))
    }

    fn key(&self, relative: &str) -> String {
        if self.prefix.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", self.prefix, relative)
        }
    }

    /// Public URL when a base URL is configured.
    pub fn public_url(&self, key: &str) -> Option<String> {
        self.public_base_url
            .as_ref()
            .map(|base| format!("{}/{}", base, key))
    }

    /// Upload an artifact and return where it landed.
    pub async fn put_artifact(&self, meta: &ArtifactMeta, bytes: Vec<u8>) -> StorageResult<StoredObject> {
        let key = self.artifact_key(meta);
        self.upload_bytes(bytes, &key, meta.format.content_type())
            .await?;

        let url = match self.public_url(&key) {
            Some(url) => url,
            None => self.presign_get(&key, self.presign_ttl).await?,
        };

        info!(key = %key, product_id = %meta.product_id, "Stored artifact");
        Ok(StoredObject { key, url })
    }

    /// Upload bytes.
    pub async fn upload_bytes(&self, data: Vec<u8>, key: &str, content_type: &str) -> StorageResult<()> {
        debug!("Uploading {} bytes to {}", data.len(), key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        Ok(())
    }

    /// Download object as bytes.
    pub async fn download_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        debug!("Downloading {}", key);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::DownloadFailed(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    /// Generate a presigned GET URL.
    pub async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    /// Delete an object.
    pub async fn delete_object(&self, key: &str) -> StorageResult<()> {
        debug!("Deleting {}", key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        Ok(())
    }

    /// Delete every stored artifact under `{prefix}/{folder}`.
    pub async fn delete_folder(&self, folder: &str) -> StorageResult<u32> {
        let keys = self.list_keys(&self.key(folder)).await?;
        let mut deleted = 0;

        // DeleteObjects accepts at most 1000 keys per call
        for chunk in keys.chunks(1000) {
            let objects: Vec<ObjectIdentifier> = chunk
                .iter()
                .filter_map(|k| match ObjectIdentifier::builder().key(k).build() {
                    Ok(id) => Some(id),
                    Err(e) => {
                        warn!(key = %k, error = %e, "Skipping invalid object key");
                        None
                    }
                })
                .collect();
            if objects.is_empty() {
                continue;
            }

            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(|e| StorageError::delete_failed(e.to_string()))?;

            self.client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| StorageError::delete_failed(e.to_string()))?;

            deleted += chunk.len() as u32;
        }

        info!(folder, deleted, "Deleted blob folder");
        Ok(deleted)
    }

    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| StorageError::ListFailed(e.to_string()))?;

            keys.extend(response.contents().iter().filter_map(|obj| obj.key.clone()));

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token;
            } else {
                break;
            }
        }

        Ok(keys)
    }

    /// Check connectivity with a head bucket call.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("Blob connectivity check failed: {}", e)))?;
        Ok(())
    }
}
