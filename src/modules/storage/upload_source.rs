//! A file received from a multipart request, before it is stored anywhere.

use std::ffi::OsStr;
use std::path::Path;

use axum::body::Bytes;
use base64::prelude::*;
use tempfile::TempPath;

/// Where the bytes of an uploaded file currently live
#[derive(Debug)]
pub enum FileContent {
    /// Fully buffered in memory
    Memory(Bytes),
    /// Streamed to a temporary file, removed on drop unless moved
    TempFile(TempPath),
}

/// An uploaded file field
#[derive(Debug)]
pub struct UploadedFile {
    /// File name as declared by the client
    pub file_name: String,
    /// Declared MIME type
    pub content_type: String,
    /// Size in bytes
    pub size: u64,
    pub content: FileContent,
}

impl UploadedFile {
    pub fn in_memory(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            size: data.len() as u64,
            content: FileContent::Memory(data),
        }
    }

    pub fn from_temp_file(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        path: TempPath,
        size: u64,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            size,
            content: FileContent::TempFile(path),
        }
    }

    /// Path of the backing temporary file, if any
    pub fn temp_path(&self) -> Option<&Path> {
        match &self.content {
            FileContent::TempFile(path) => Some(&**path),
            FileContent::Memory(_) => None,
        }
    }

    /// Extension of the original file name, case preserved.
    ///
    /// Only plain ASCII alphanumeric extensions are returned so the value is
    /// safe to reuse in generated file names and object keys.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name)
            .extension()
            .and_then(OsStr::to_str)
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
    }

    /// Read the whole content, from memory or from the temporary file
    pub async fn read_bytes(&self) -> std::io::Result<Bytes> {
        match &self.content {
            FileContent::Memory(data) => Ok(data.clone()),
            FileContent::TempFile(path) => tokio::fs::read(path).await.map(Bytes::from),
        }
    }

    /// Encode the content as a `data:` URI
    pub async fn to_data_uri(&self) -> std::io::Result<String> {
        let data = self.read_bytes().await?;
        Ok(format!(
            "data:{};base64,{}",
            self.content_type,
            BASE64_STANDARD.encode(&data)
        ))
    }
}
