//! File uploads.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/v1/localServerUpload` | Store a file on the server's disk |
//! | POST | `/api/v1/imageUpload` | Upload an image to remote storage and record its metadata |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use handlers::{FileBuffering, UploadState};
pub use repositories::PgUploadRecordRepository;
pub use routes::routes;
pub use services::UploadService;
