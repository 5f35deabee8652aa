//! MinIO/S3-compatible remote storage
//!
//! Objects are written under `{public_prefix}/{folder}/` and served through the
//! public endpoint; the object key doubles as the opaque `public_id`.

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Url};
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::config::MinIOConfig;
use crate::core::error::AppError;
use crate::modules::storage::upload_source::UploadedFile;
use crate::modules::storage::{RemoteStorage, StoredObject};

type HmacSha256 = Hmac<Sha256>;

pub struct MinIOClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    config: MinIOConfig,
    /// HTTP client for bucket policy operations
    http_client: Client,
}

impl MinIOClient {
    /// Connect to the bucket, creating it and its public-read policy if needed
    pub async fn new(config: MinIOConfig) -> Result<Self, AppError> {
        let client = Self::connect(config)?;

        client.ensure_bucket_exists().await;
        client.ensure_public_read_policy().await;

        info!(
            "MinIO client initialized for endpoint: {}, bucket: {}, public_prefix: {}",
            client.config.endpoint,
            client.bucket.name(),
            client.config.public_prefix
        );

        Ok(client)
    }

    /// Build the client without touching the server
    fn connect(config: MinIOConfig) -> Result<Self, AppError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Failed to create MinIO credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| AppError::Internal(format!("Failed to create MinIO bucket: {}", e)))?;

        // Path-style URLs: http://endpoint/bucket instead of http://bucket.endpoint
        bucket.set_path_style();

        let http_client = Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            bucket,
            region,
            credentials,
            config,
            http_client,
        })
    }

    pub fn bucket_name(&self) -> String {
        self.bucket.name()
    }

    /// Create the bucket; an existing bucket is not an error
    async fn ensure_bucket_exists(&self) {
        let created = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match created {
            Ok(_) => info!("Bucket '{}' created", self.bucket.name()),
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        self.bucket.name(),
                        e
                    );
                }
            }
        }
    }

    /// Allow anonymous GET on `{public_prefix}/*` so returned URLs resolve
    async fn ensure_public_read_policy(&self) {
        let bucket_name = self.bucket.name();
        let policy = json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": {"AWS": "*"},
                "Action": ["s3:GetObject"],
                "Resource": [format!("arn:aws:s3:::{}/{}/*", bucket_name, self.config.public_prefix)]
            }]
        })
        .to_string();

        if let Err(e) = self.put_bucket_policy(&bucket_name, &policy).await {
            warn!(
                "Failed to set bucket policy for '{}': {}. Set it manually with: \
                 mc anonymous set download minio/{}/{}",
                bucket_name, e, bucket_name, self.config.public_prefix
            );
        }
    }

    /// `PUT /{bucket}?policy` signed with AWS Signature v4
    async fn put_bucket_policy(&self, bucket_name: &str, policy: &str) -> Result<(), AppError> {
        let endpoint = Url::parse(&self.config.endpoint)
            .map_err(|e| AppError::Internal(format!("Invalid endpoint URL: {}", e)))?;
        let host = endpoint
            .host_str()
            .ok_or_else(|| AppError::Internal("Endpoint URL has no host".to_string()))?;
        let host = match endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let now = Utc::now();
        let request = SigV4Request {
            method: "PUT",
            canonical_uri: format!("/{}", bucket_name),
            canonical_query: "policy=",
            host: &host,
            amz_date: now.format("%Y%m%dT%H%M%SZ").to_string(),
            date_stamp: now.format("%Y%m%d").to_string(),
            payload_hash: hex::encode(Sha256::digest(policy.as_bytes())),
        };
        let authorization = request.authorization(
            &self.config.access_key,
            &self.config.secret_key,
            &self.config.region,
        )?;

        let response = self
            .http_client
            .put(format!("{}/{}?policy", self.config.endpoint, bucket_name))
            .header("Host", &host)
            .header("x-amz-date", &request.amz_date)
            .header("x-amz-content-sha256", &request.payload_hash)
            .header("Authorization", authorization)
            .header("Content-Type", "application/json")
            .body(policy.to_string())
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to send policy request: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            info!(
                "Set public read policy for {}/{}/*",
                bucket_name, self.config.public_prefix
            );
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::Internal(format!(
            "Failed to set bucket policy: {} - {}",
            status, body
        )))
    }

    /// `{public_prefix}/{folder}/{uuid}[.ext]`
    fn object_key(&self, file: &UploadedFile, folder: &str) -> String {
        let folder = folder.trim_matches('/');
        let name = match file.extension() {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_lowercase()),
            None => Uuid::new_v4().to_string(),
        };
        if folder.is_empty() {
            format!("{}/{}", self.config.public_prefix, name)
        } else {
            format!("{}/{}/{}", self.config.public_prefix, folder, name)
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.public_endpoint.trim_end_matches('/'),
            self.bucket.name(),
            key
        )
    }
}

#[async_trait]
impl RemoteStorage for MinIOClient {
    fn provider(&self) -> &'static str {
        "minio"
    }

    async fn upload(&self, file: &UploadedFile, folder: &str) -> Result<StoredObject, AppError> {
        let key = self.object_key(file, folder);

        match file.temp_path() {
            Some(path) => {
                debug!("Streaming '{}' from {}", key, path.display());
                let mut reader = tokio::fs::File::open(path).await?;
                self.bucket
                    .put_object_stream_with_content_type(&mut reader, &key, &file.content_type)
                    .await
                    .map_err(|e| {
                        AppError::Storage(format!("Failed to upload file '{}': {}", key, e))
                    })?;
            }
            None => {
                let data = file.read_bytes().await?;
                let response = self
                    .bucket
                    .put_object_with_content_type(&key, &data, &file.content_type)
                    .await
                    .map_err(|e| {
                        AppError::Storage(format!("Failed to upload file '{}': {}", key, e))
                    })?;
                if response.status_code() >= 300 {
                    return Err(AppError::Storage(format!(
                        "Failed to upload file '{}': status {} - {}",
                        key,
                        response.status_code(),
                        String::from_utf8_lossy(response.as_slice())
                    )));
                }
            }
        }

        debug!("Uploaded file '{}' to bucket '{}'", key, self.bucket.name());

        Ok(StoredObject {
            url: self.public_url(&key),
            public_id: key,
        })
    }
}

/// The parts of an S3 request that go into a Signature v4
struct SigV4Request<'a> {
    method: &'a str,
    canonical_uri: String,
    canonical_query: &'a str,
    host: &'a str,
    amz_date: String,
    date_stamp: String,
    payload_hash: String,
}

impl SigV4Request<'_> {
    const ALGORITHM: &'static str = "AWS4-HMAC-SHA256";
    const SIGNED_HEADERS: &'static str = "host;x-amz-content-sha256;x-amz-date";

    fn authorization(
        &self,
        access_key: &str,
        secret_key: &str,
        region: &str,
    ) -> Result<String, AppError> {
        let canonical_headers = format!(
            "host:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
            self.host, self.payload_hash, self.amz_date
        );
        let canonical_request: [&str; 6] = [
            self.method,
            &self.canonical_uri,
            self.canonical_query,
            &canonical_headers,
            Self::SIGNED_HEADERS,
            &self.payload_hash,
        ];
        let canonical_request = canonical_request.join("\n");

        let scope = format!("{}/{}/s3/aws4_request", self.date_stamp, region);
        let request_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
        let string_to_sign: [&str; 4] = [Self::ALGORITHM, &self.amz_date, &scope, &request_hash];
        let string_to_sign = string_to_sign.join("\n");

        let mut key = format!("AWS4{}", secret_key).into_bytes();
        let scope_parts: [&[u8]; 4] = [
            self.date_stamp.as_bytes(),
            region.as_bytes(),
            b"s3",
            b"aws4_request",
        ];
        for part in scope_parts {
            key = hmac_sha256(&key, part)?;
        }
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

        Ok(format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            Self::ALGORITHM,
            access_key,
            scope,
            Self::SIGNED_HEADERS,
            signature
        ))
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, AppError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(format!("HMAC key error: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OBJECT_PATH: &str = r"^/file-uploads/public/Temp/[0-9a-f-]{36}\.png$";

    fn config(endpoint: &str) -> MinIOConfig {
        MinIOConfig {
            endpoint: endpoint.to_string(),
            public_endpoint: "https://files.example.com/".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            bucket: "file-uploads".to_string(),
            region: "us-east-1".to_string(),
            public_prefix: "public".to_string(),
        }
    }

    fn client(endpoint: &str) -> MinIOClient {
        MinIOClient::connect(config(endpoint)).unwrap()
    }

    #[test]
    fn test_object_key_layout() {
        let client = client("http://localhost:9000");

        let image = UploadedFile::in_memory("Cat.PNG", "image/png", Vec::new());
        let key = client.object_key(&image, "/Temp/");
        let name = key.strip_prefix("public/Temp/").unwrap();
        let stem = name.strip_suffix(".png").unwrap();
        assert!(Uuid::parse_str(stem).is_ok());

        let key = client.object_key(&image, "");
        let name = key.strip_prefix("public/").unwrap();
        assert!(!name.contains('/'));
        assert!(name.ends_with(".png"));

        let plain = UploadedFile::in_memory("README", "text/plain", Vec::new());
        let key = client.object_key(&plain, "Temp");
        let name = key.strip_prefix("public/Temp/").unwrap();
        assert!(Uuid::parse_str(name).is_ok());
    }

    #[test]
    fn test_public_url_joins_endpoint_bucket_and_key() {
        let client = client("http://localhost:9000");
        assert_eq!(
            client.public_url("public/Temp/x.png"),
            "https://files.example.com/file-uploads/public/Temp/x.png"
        );
    }

    #[tokio::test]
    async fn test_upload_buffer() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(OBJECT_PATH))
            .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"abc\""))
            .expect(1)
            .mount(&server)
            .await;

        let file = UploadedFile::in_memory("cat.png", "image/png", b"png bytes".to_vec());
        let stored = client(&server.uri()).upload(&file, "Temp").await.unwrap();

        assert!(stored.public_id.starts_with("public/Temp/"));
        assert_eq!(
            stored.url,
            format!("https://files.example.com/file-uploads/{}", stored.public_id)
        );

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].body, b"png bytes");
    }

    #[tokio::test]
    async fn test_upload_temp_file() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(OBJECT_PATH))
            .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"abc\""))
            .expect(1)
            .mount(&server)
            .await;

        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(b"bytes from disk").unwrap();
        let file =
            UploadedFile::from_temp_file("cat.png", "image/png", temp.into_temp_path(), 15);

        let stored = client(&server.uri()).upload(&file, "Temp").await.unwrap();
        assert!(stored.url.ends_with(&stored.public_id));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].body, b"bytes from disk");
    }

    #[tokio::test]
    async fn test_rejected_put_is_storage_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_string("<Error><Code>AccessDenied</Code></Error>"),
            )
            .mount(&server)
            .await;

        let file = UploadedFile::in_memory("cat.png", "image/png", b"png bytes".to_vec());
        let err = client(&server.uri()).upload(&file, "Temp").await.unwrap_err();

        match err {
            AppError::Storage(msg) => assert!(msg.contains("AccessDenied")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_sigv4_authorization_shape() {
        let request = SigV4Request {
            method: "PUT",
            canonical_uri: "/uploads".to_string(),
            canonical_query: "policy=",
            host: "localhost:9000",
            amz_date: "20250101T000000Z".to_string(),
            date_stamp: "20250101".to_string(),
            payload_hash: hex::encode(Sha256::digest(b"{}")),
        };

        let header = request
            .authorization("minioadmin", "minioadmin", "us-east-1")
            .unwrap();

        assert!(header.starts_with(
            "AWS4-HMAC-SHA256 Credential=minioadmin/20250101/us-east-1/s3/aws4_request, "
        ));
        assert!(header.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));
        let signature = header.rsplit("Signature=").next().unwrap();
        assert_eq!(signature.len(), 64);

        // Deterministic for identical input
        let again = request
            .authorization("minioadmin", "minioadmin", "us-east-1")
            .unwrap();
        assert_eq!(header, again);
    }
}
