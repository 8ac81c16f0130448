//! S3-compatible artifact store (MinIO and friends).
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;

use crate::error::{AppError, AppResult};
use crate::storage::ArtifactStore;

pub struct S3Store {
    client: S3Client,
    bucket: String,
}

impl S3Store {
    /// Connect with static credentials against a custom endpoint and make
    /// sure the bucket exists. Path-style addressing is required for MinIO.
    pub async fn connect(endpoint: &str, access_key: &str, secret_key: &str, bucket: &str) -> AppResult<Self> {
        let credentials = Credentials::new(access_key, secret_key, None, None, "minio");

        // MinIO does not care about the region but the SDK wants one.
        let config = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new("us-east-1"))
            .endpoint_url(endpoint)
            .load()
            .await;

        let client = S3Client::from_conf(
            aws_sdk_s3::config::Builder::from(&config)
                .force_path_style(true)
                .build(),
        );

        let store = S3Store {
            client,
            bucket: bucket.to_string(),
        };
        store.ensure_bucket().await?;
        Ok(store)
    }

    async fn ensure_bucket(&self) -> AppResult<()> {
        if self.client.head_bucket().bucket(&self.bucket).send().await.is_ok() {
            return Ok(());
        }
        tracing::info!("Bucket {} not found, creating it", self.bucket);
        self.client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create bucket {}: {}", self.bucket, e)))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ArtifactStore for S3Store {
    async fn put(&self, name: &str, bytes: &[u8]) -> AppResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .body(ByteStream::from(bytes.to_vec()))
            .content_type("image/jpeg")
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to store object {}: {}", name, e)))?;
        Ok(())
    }

    async fn get(&self, name: &str) -> AppResult<Vec<u8>> {
        let response = match self.client.get_object().bucket(&self.bucket).key(name).send().await {
            Ok(response) => response,
            Err(e) => {
                let service = e.into_service_error();
                return if service.is_no_such_key() {
                    Err(AppError::NotFound(name.to_string()))
                } else {
                    Err(AppError::Storage(format!("Failed to read object {}: {}", name, service)))
                };
            }
        };

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read object body {}: {}", name, e)))?;
        Ok(bytes.to_vec())
    }
}
