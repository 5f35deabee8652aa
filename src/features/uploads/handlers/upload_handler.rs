use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use tracing::debug;
use validator::Validate;

use crate::core::error::AppError;
use crate::features::uploads::dtos::{
    is_file_type_supported, ImageMetadataDto, ImageUploadDto, LocalUploadDto,
    LocalUploadResponseDto, UploadRecordDto, SUPPORTED_IMAGE_TYPES,
};
use crate::features::uploads::handlers::{FileBuffering, UploadForm};
use crate::features::uploads::services::UploadService;
use crate::shared::types::ApiResponse;

/// State for upload handlers
#[derive(Clone)]
pub struct UploadState {
    pub upload_service: Arc<UploadService>,
    pub buffering: FileBuffering,
}

/// Read the multipart body, treating a body that is not multipart as "no file"
async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
    buffering: &FileBuffering,
) -> Result<UploadForm, AppError> {
    match multipart {
        Ok(multipart) => UploadForm::read(multipart, buffering).await,
        Err(rejection) => {
            debug!("Request body is not multipart: {}", rejection);
            Ok(UploadForm::default())
        }
    }
}

/// Store a file on the server's local disk
///
/// Accepts multipart/form-data with:
/// - `file`: The file to store (required)
#[utoipa::path(
    post,
    path = "/api/v1/localServerUpload",
    tag = "uploads",
    request_body(
        content = LocalUploadDto,
        content_type = "multipart/form-data",
        description = "File to store on the server",
    ),
    responses(
        (status = 200, description = "File stored locally", body = LocalUploadResponseDto),
        (status = 400, description = "No file uploaded"),
        (status = 413, description = "File too large"),
        (status = 500, description = "File could not be written")
    )
)]
pub async fn local_server_upload(
    State(state): State<UploadState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<LocalUploadResponseDto>, AppError> {
    let form = read_form(multipart, &state.buffering).await?;
    let file = form
        .file
        .ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

    let path = state.upload_service.upload_local(file).await?;

    Ok(Json(LocalUploadResponseDto {
        success: true,
        message: "File uploaded locally successfully".to_string(),
        path: path.to_string_lossy().into_owned(),
    }))
}

/// Upload an image to remote storage and save its metadata
///
/// Accepts multipart/form-data with:
/// - `file`: The image (required; jpg, jpeg, png or gif)
/// - `name`: Display name (required)
/// - `tags`: Tags (required; `tag` is accepted as well)
#[utoipa::path(
    post,
    path = "/api/v1/imageUpload",
    tag = "uploads",
    request_body(
        content = ImageUploadDto,
        content_type = "multipart/form-data",
        description = "Image with its name and tags",
    ),
    responses(
        (status = 200, description = "Image uploaded and metadata saved", body = ApiResponse<UploadRecordDto>),
        (status = 400, description = "Missing file, missing name/tags, or unsupported file type"),
        (status = 413, description = "File too large"),
        (status = 500, description = "Upload or metadata write failed")
    )
)]
pub async fn image_upload(
    State(state): State<UploadState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<UploadRecordDto>>, AppError> {
    let form = read_form(multipart, &state.buffering).await?;
    let file = form
        .file
        .ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

    let metadata = ImageMetadataDto::from_form(form.name, form.tags);
    metadata.validate().map_err(|e| {
        debug!("Image metadata rejected: {}", e);
        AppError::Validation("Name and tags are required fields".to_string())
    })?;

    let extension = file.extension().unwrap_or_default().to_lowercase();
    if !is_file_type_supported(&extension) {
        return Err(AppError::BadRequest(format!(
            "File type not supported. Please use one of: {}",
            SUPPORTED_IMAGE_TYPES.join(", ")
        )));
    }

    let record = state.upload_service.upload_image(file, metadata).await?;

    Ok(Json(ApiResponse::success(
        Some(record),
        Some("Image successfully uploaded and data saved".to_string()),
    )))
}
