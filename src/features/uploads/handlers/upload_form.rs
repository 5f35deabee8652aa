use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::error::{AppError, Result};
use crate::modules::storage::UploadedFile;

/// How the `file` field of a multipart request is held until it is stored
#[derive(Debug, Clone)]
pub enum FileBuffering {
    Memory,
    /// Stream the field into a temporary file in this directory
    TempFiles(PathBuf),
}

/// Fields of an upload request
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub name: Option<String>,
    pub tags: Option<String>,
}

impl UploadForm {
    /// Read every field of the multipart stream
    ///
    /// A `file` part without a file name, or with an empty one, is not treated
    /// as a file. `tag` is accepted as an alias of `tags`. Other fields are
    /// ignored.
    pub async fn read(mut multipart: Multipart, buffering: &FileBuffering) -> Result<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, "multipart data"))?
        {
            let field_name = field.name().unwrap_or("").to_string();

            match field_name.as_str() {
                "file" if field.file_name().is_some_and(|n| !n.is_empty()) => {
                    form.file = Some(read_file(field, buffering).await?);
                }
                "name" => form.name = Some(read_text(field).await?),
                "tags" | "tag" => form.tags = Some(read_text(field).await?),
                _ => debug!("Ignoring field: {}", field_name),
            }
        }

        Ok(form)
    }
}

/// Body-limit failures become 413, anything else is a malformed request
fn multipart_error(error: MultipartError, what: &str) -> AppError {
    debug!("Failed to read {}: {}", what, error);
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("File exceeds the upload size limit".to_string())
    } else {
        AppError::BadRequest(format!("Failed to read {}: {}", what, error))
    }
}

async fn read_text(field: Field<'_>) -> Result<String> {
    let name = format!("{} field", field.name().unwrap_or(""));
    field.text().await.map_err(|e| multipart_error(e, &name))
}

async fn read_file(field: Field<'_>, buffering: &FileBuffering) -> Result<UploadedFile> {
    let file_name = field.file_name().unwrap_or("unnamed").to_string();
    let content_type = field
        .content_type()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    match buffering {
        FileBuffering::Memory => {
            let data = field
                .bytes()
                .await
                .map_err(|e| multipart_error(e, "file data"))?;
            Ok(UploadedFile::in_memory(file_name, content_type, data))
        }
        FileBuffering::TempFiles(dir) => {
            let (path, size) = stream_to_temp_file(field, dir).await?;
            debug!("Buffered '{}' to {} ({} bytes)", file_name, path.display(), size);
            Ok(UploadedFile::from_temp_file(
                file_name,
                content_type,
                path,
                size,
            ))
        }
    }
}

async fn stream_to_temp_file(
    mut field: Field<'_>,
    dir: &Path,
) -> Result<(tempfile::TempPath, u64)> {
    tokio::fs::create_dir_all(dir).await?;
    let (file, path) = tempfile::Builder::new()
        .prefix("upload-")
        .tempfile_in(dir)?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut size = 0u64;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, "file data"))?
    {
        size += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok((path, size))
}
