use axum::{extract::DefaultBodyLimit, routing::post, Router};

use crate::features::uploads::handlers::{image_upload, local_server_upload, UploadState};

/// Create routes for the uploads feature
pub fn routes(state: UploadState, max_body_size: usize) -> Router {
    Router::new()
        .route("/api/v1/localServerUpload", post(local_server_upload))
        .route("/api/v1/imageUpload", post(image_upload))
        // videoUpload and sizeBreak stay disabled
        .layer(DefaultBodyLimit::max(max_body_size))
        .with_state(state)
}
