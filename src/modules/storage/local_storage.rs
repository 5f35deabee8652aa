//! Local filesystem storage for the `localServerUpload` route.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::error::AppError;
use crate::modules::storage::upload_source::{FileContent, UploadedFile};

/// Stores uploaded files under a single directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{unix_millis}-{random}{.ext}`; the extension comes from the original name
    pub fn generate_filename(file: &UploadedFile) -> String {
        let stem = format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        match file.extension() {
            Some(ext) => format!("{}.{}", stem, ext),
            None => stem,
        }
    }

    /// Move the file into the storage directory and return its absolute path
    ///
    /// The directory is created on demand. Temporary files are renamed into
    /// place, falling back to a copy when the rename crosses filesystems.
    pub async fn store(&self, file: UploadedFile) -> Result<PathBuf, AppError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let destination = self.root.join(Self::generate_filename(&file));

        match file.content {
            FileContent::Memory(data) => {
                tokio::fs::write(&destination, &data).await?;
            }
            FileContent::TempFile(temp) => {
                let source = temp.keep().map_err(|e| AppError::Io(e.error))?;
                move_file(&source, &destination).await?;
            }
        }

        let stored = tokio::fs::canonicalize(&destination).await?;
        info!(
            "Stored '{}' locally at {} ({} bytes)",
            file.file_name,
            stored.display(),
            file.size
        );

        Ok(stored)
    }
}

async fn move_file(source: &Path, destination: &Path) -> std::io::Result<()> {
    if let Err(e) = tokio::fs::rename(source, destination).await {
        debug!(
            "Rename {} -> {} failed ({}), copying instead",
            source.display(),
            destination.display(),
            e
        );
        let copied = tokio::fs::copy(source, destination).await;
        let _ = tokio::fs::remove_file(source).await;
        copied?;
    }
    Ok(())
}
