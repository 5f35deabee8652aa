mod upload_form;
pub mod upload_handler;

pub use upload_form::{FileBuffering, UploadForm};
pub use upload_handler::{
    __path_image_upload, __path_local_server_upload, image_upload, local_server_upload,
    UploadState,
};
