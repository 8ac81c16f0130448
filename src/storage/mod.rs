//! Artifact storage behind a capability trait.
//!
//! Two interchangeable backends persist generated images: a local directory
//! and an S3-compatible bucket. Exactly one is active per process, selected
//! by configuration at startup; nothing else in the gateway knows which.
pub mod local;
pub mod s3;

pub use local::LocalStore;
pub use s3::S3Store;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::StorageConfig;
use crate::error::AppResult;

/// Contract shared by the backends: bytes written under a name can later be
/// read back unchanged by that name, and reading a name never written yields
/// [`crate::error::AppError::NotFound`].
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(&self, name: &str, bytes: &[u8]) -> AppResult<()>;
    async fn get(&self, name: &str) -> AppResult<Vec<u8>>;
}

/// Build the backend selected by configuration. The S3 variant creates its
/// bucket here when absent, so a misconfigured store fails at startup rather
/// than on the first request.
pub async fn from_config(storage: &StorageConfig) -> AppResult<Arc<dyn ArtifactStore>> {
    match storage {
        StorageConfig::Local { dir } => Ok(Arc::new(LocalStore::open(dir.clone()).await?)),
        StorageConfig::S3 { endpoint, access_key, secret_key, bucket } => Ok(Arc::new(
            S3Store::connect(endpoint, access_key, secret_key, bucket).await?,
        )),
    }
}
