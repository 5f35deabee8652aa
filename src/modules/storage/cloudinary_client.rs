//! Cloudinary upload API client
//!
//! Uploads go to `{api_base}/v1_1/{cloud_name}/auto/upload` so Cloudinary
//! detects the resource type itself. Requests are signed with SHA-256 over the
//! sorted upload parameters followed by the API secret.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::core::config::CloudinaryConfig;
use crate::core::error::AppError;
use crate::modules::storage::upload_source::UploadedFile;
use crate::modules::storage::{RemoteStorage, StoredObject};

const SIGNATURE_ALGORITHM: &str = "sha256";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

pub struct CloudinaryClient {
    http_client: Client,
    upload_url: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let upload_url = format!("{}/v1_1/{}/auto/upload", config.api_base, config.cloud_name);

        info!("Cloudinary client initialized for cloud: {}", config.cloud_name);

        Ok(Self {
            http_client,
            upload_url,
            api_key: config.api_key,
            api_secret: config.api_secret,
        })
    }

    /// Hex SHA-256 of `k1=v1&k2=v2...{api_secret}` with keys sorted
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let to_sign = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        hex::encode(Sha256::digest(format!("{}{}", to_sign, self.api_secret)))
    }

    async fn parse_response(response: reqwest::Response) -> Result<StoredObject, AppError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(AppError::Storage(format!(
                "Cloudinary upload failed ({}): {}",
                status, message
            )));
        }

        let body: UploadResponse = response.json().await.map_err(|e| {
            AppError::Storage(format!("Invalid Cloudinary upload response: {}", e))
        })?;

        Ok(StoredObject {
            url: body.secure_url,
            public_id: body.public_id,
        })
    }
}

#[async_trait]
impl RemoteStorage for CloudinaryClient {
    fn provider(&self) -> &'static str {
        "cloudinary"
    }

    async fn upload(&self, file: &UploadedFile, folder: &str) -> Result<StoredObject, AppError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[("folder", folder), ("timestamp", &timestamp)]);

        let request = self.http_client.post(&self.upload_url);

        let request = match file.temp_path() {
            Some(path) => {
                debug!("Streaming from temporary file path: {}", path.display());
                let reader = tokio::fs::File::open(path).await?;
                let size = reader.metadata().await?.len();
                let body = Body::wrap_stream(ReaderStream::new(reader));
                let part = Part::stream_with_length(body, size)
                    .file_name(file.file_name.clone())
                    .mime_str(&file.content_type)
                    .map_err(|e| {
                        AppError::BadRequest(format!(
                            "Invalid content type '{}': {}",
                            file.content_type, e
                        ))
                    })?;
                let form = Form::new()
                    .part("file", part)
                    .text("api_key", self.api_key.clone())
                    .text("timestamp", timestamp.clone())
                    .text("folder", folder.to_string())
                    .text("signature", signature)
                    .text("signature_algorithm", SIGNATURE_ALGORITHM);
                request.multipart(form)
            }
            None => {
                debug!("Uploading from memory buffer as data URI");
                let data_uri = file.to_data_uri().await?;
                request.form(&[
                    ("file", data_uri.as_str()),
                    ("api_key", self.api_key.as_str()),
                    ("timestamp", timestamp.as_str()),
                    ("folder", folder),
                    ("signature", signature.as_str()),
                    ("signature_algorithm", SIGNATURE_ALGORITHM),
                ])
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to reach Cloudinary: {}", e)))?;

        let stored = Self::parse_response(response).await?;
        debug!(
            "Uploaded '{}' to Cloudinary as {}",
            file.file_name, stored.public_id
        );
        Ok(stored)
    }
}
