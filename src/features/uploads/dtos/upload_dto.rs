use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::uploads::models::UploadRecord;

/// Local upload request DTO for OpenAPI documentation
/// Note: The handler reads the multipart stream directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct LocalUploadDto {
    /// The file to store on the server
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

/// Image upload request DTO for OpenAPI documentation
/// Note: The handler reads the multipart stream directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct ImageUploadDto {
    /// The image to upload (jpg, jpeg, png or gif)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    /// Display name of the image
    #[schema(example = "cat")]
    pub name: String,
    /// Free-form tags (the field name `tag` is accepted too)
    #[schema(example = "pets")]
    pub tags: String,
}

/// Text fields that accompany an image upload
#[derive(Debug, Clone, Validate)]
pub struct ImageMetadataDto {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "tags is required"))]
    pub tags: String,
}

impl ImageMetadataDto {
    /// Build from raw form values, trimming whitespace
    pub fn from_form(name: Option<String>, tags: Option<String>) -> Self {
        Self {
            name: name.as_deref().unwrap_or_default().trim().to_string(),
            tags: tags.as_deref().unwrap_or_default().trim().to_string(),
        }
    }
}

/// Response body of the local upload route
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LocalUploadResponseDto {
    pub success: bool,
    pub message: String,
    /// Absolute path of the stored file on the server
    pub path: String,
}

/// Stored metadata of a remotely uploaded image
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecordDto {
    pub id: Uuid,
    pub name: String,
    pub tags: String,
    /// Durable URL of the stored object
    pub image_url: String,
    /// Storage provider reference, used for later deletion or replacement
    pub public_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UploadRecord> for UploadRecordDto {
    fn from(record: UploadRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            tags: record.tags,
            image_url: record.image_url,
            public_id: record.public_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Image extensions accepted by the image upload route
pub const SUPPORTED_IMAGE_TYPES: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// Check a lower-cased extension against [`SUPPORTED_IMAGE_TYPES`]
pub fn is_file_type_supported(extension: &str) -> bool {
    SUPPORTED_IMAGE_TYPES.contains(&extension)
}
