//! Storage module for uploaded files
//!
//! Local disk storage for the local upload route, and remote providers
//! (Cloudinary or MinIO/S3) behind the [`RemoteStorage`] trait.

mod cloudinary_client;
mod local_storage;
mod minio_client;
mod upload_source;

use async_trait::async_trait;

use crate::core::error::AppError;

pub use cloudinary_client::CloudinaryClient;
pub use local_storage::LocalStorage;
pub use minio_client::MinIOClient;
pub use upload_source::UploadedFile;

/// A stored object as reported by the remote provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Durable URL of the object
    pub url: String,
    /// Provider reference usable for later deletion or replacement
    pub public_id: String,
}

/// Remote object storage
///
/// A single attempt is made per call; failures surface as [`AppError::Storage`].
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    fn provider(&self) -> &'static str;

    /// Upload `file` into the logical `folder` with resource-type auto-detection
    async fn upload(&self, file: &UploadedFile, folder: &str) -> Result<StoredObject, AppError>;
}
