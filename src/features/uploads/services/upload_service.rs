use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use crate::core::error::Result;
use crate::features::uploads::dtos::{ImageMetadataDto, UploadRecordDto};
use crate::features::uploads::models::NewUploadRecord;
use crate::features::uploads::repositories::UploadRecordRepository;
use crate::modules::storage::{LocalStorage, RemoteStorage, UploadedFile};

/// Dispatches uploads to local or remote storage and records remote ones
pub struct UploadService {
    local_storage: LocalStorage,
    remote_storage: Arc<dyn RemoteStorage>,
    records: Arc<dyn UploadRecordRepository>,
    remote_folder: String,
}

impl UploadService {
    pub fn new(
        local_storage: LocalStorage,
        remote_storage: Arc<dyn RemoteStorage>,
        records: Arc<dyn UploadRecordRepository>,
        remote_folder: impl Into<String>,
    ) -> Self {
        Self {
            local_storage,
            remote_storage,
            records,
            remote_folder: remote_folder.into(),
        }
    }

    /// Store the file on the server's disk and return where it landed
    pub async fn upload_local(&self, file: UploadedFile) -> Result<PathBuf> {
        info!(
            "Storing '{}' ({} bytes) under {}",
            file.file_name,
            file.size,
            self.local_storage.root().display()
        );
        self.local_storage.store(file).await
    }

    /// Upload the image to the remote provider, then record its metadata
    ///
    /// The record is written only after the upload succeeds. A failed record
    /// write leaves the remote object in place.
    pub async fn upload_image(
        &self,
        file: UploadedFile,
        metadata: ImageMetadataDto,
    ) -> Result<UploadRecordDto> {
        info!(
            "Uploading '{}' to {} folder '{}'",
            file.file_name,
            self.remote_storage.provider(),
            self.remote_folder
        );

        let stored = self
            .remote_storage
            .upload(&file, &self.remote_folder)
            .await?;
        drop(file);

        info!("File uploaded successfully: {}", stored.url);

        let record = self
            .records
            .create(NewUploadRecord {
                name: metadata.name,
                tags: metadata.tags,
                image_url: stored.url,
                public_id: Some(stored.public_id.clone()),
            })
            .await
            .map_err(|e| {
                error!(
                    "Recording upload failed, remote object '{}' is orphaned",
                    stored.public_id
                );
                e
            })?;

        Ok(record.into())
    }
}
