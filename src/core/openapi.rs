use utoipa::{Modify, OpenApi};

use crate::features::uploads::{dtos as uploads_dtos, handlers as uploads_handlers};
use crate::shared::types::ApiResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        uploads_handlers::local_server_upload,
        uploads_handlers::image_upload,
    ),
    components(
        schemas(
            uploads_dtos::LocalUploadDto,
            uploads_dtos::ImageUploadDto,
            uploads_dtos::LocalUploadResponseDto,
            uploads_dtos::UploadRecordDto,
            ApiResponse<uploads_dtos::UploadRecordDto>,
        )
    ),
    tags(
        (name = "uploads", description = "Local and remote file uploads"),
    ),
    info(
        title = "File Upload API",
        version = "0.1.0",
        description = "Local and remote file upload service",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
