use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::Utc;
use tempfile::TempDir;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::uploads::models::{NewUploadRecord, UploadRecord};
use crate::features::uploads::repositories::UploadRecordRepository;
use crate::features::uploads::{routes, FileBuffering, UploadService, UploadState};
use crate::modules::storage::{LocalStorage, RemoteStorage, StoredObject, UploadedFile};

/// Remote storage double returning a fixed result and remembering uploads
pub struct FakeRemoteStorage {
    result: std::result::Result<StoredObject, String>,
    uploads: Mutex<Vec<(String, String)>>,
}

impl FakeRemoteStorage {
    pub fn succeeding(url: &str, public_id: &str) -> Self {
        Self {
            result: Ok(StoredObject {
                url: url.to_string(),
                public_id: public_id.to_string(),
            }),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// `(file name, folder)` of every upload attempt
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteStorage for FakeRemoteStorage {
    fn provider(&self) -> &'static str {
        "fake"
    }

    async fn upload(&self, file: &UploadedFile, folder: &str) -> Result<StoredObject> {
        self.uploads
            .lock()
            .unwrap()
            .push((file.file_name.clone(), folder.to_string()));
        self.result.clone().map_err(AppError::Storage)
    }
}

/// Record store kept in memory, with the defaults the database would apply
#[derive(Default)]
pub struct InMemoryUploadRecordRepository {
    records: Mutex<Vec<UploadRecord>>,
}

impl InMemoryUploadRecordRepository {
    pub fn all(&self) -> Vec<UploadRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl UploadRecordRepository for InMemoryUploadRecordRepository {
    async fn create(&self, record: NewUploadRecord) -> Result<UploadRecord> {
        let now = Utc::now();
        let created = UploadRecord {
            id: Uuid::new_v4(),
            name: record.name,
            tags: record.tags,
            image_url: record.image_url,
            public_id: record.public_id,
            created_at: now,
            updated_at: now,
        };
        self.records.lock().unwrap().push(created.clone());
        Ok(created)
    }
}

/// Record store whose writes always fail like an unreachable database
pub struct FailingUploadRecordRepository;

#[async_trait]
impl UploadRecordRepository for FailingUploadRecordRepository {
    async fn create(&self, _record: NewUploadRecord) -> Result<UploadRecord> {
        Err(AppError::Database(sqlx::Error::PoolTimedOut))
    }
}

#[derive(Default)]
pub struct TestAppOptions {
    pub use_temp_files: bool,
    /// Make the remote provider fail with this message
    pub remote_failure: Option<String>,
}

/// Upload routes served in-process over temporary directories
pub struct TestApp {
    pub server: TestServer,
    pub remote: Arc<FakeRemoteStorage>,
    pub records: Arc<InMemoryUploadRecordRepository>,
    temp_dir: PathBuf,
    _root: TempDir,
}

impl TestApp {
    pub fn new(options: TestAppOptions) -> Self {
        let root = tempfile::tempdir().unwrap();
        let temp_dir = root.path().join("tmp");

        let remote = Arc::new(match options.remote_failure {
            Some(message) => FakeRemoteStorage::failing(&message),
            None => FakeRemoteStorage::succeeding("https://cdn/x.png", "abc"),
        });
        let records = Arc::new(InMemoryUploadRecordRepository::default());

        let service = UploadService::new(
            LocalStorage::new(root.path().join("uploads")),
            remote.clone(),
            records.clone(),
            "Temp",
        );
        let buffering = if options.use_temp_files {
            FileBuffering::TempFiles(temp_dir.clone())
        } else {
            FileBuffering::Memory
        };

        let router = routes(
            UploadState {
                upload_service: Arc::new(service),
                buffering,
            },
            10 * 1024 * 1024,
        );

        Self {
            server: TestServer::new(router).unwrap(),
            remote,
            records,
            temp_dir,
            _root: root,
        }
    }

    /// Whether no temporary upload file was left behind
    pub async fn temp_dir_is_empty(&self) -> bool {
        match tokio::fs::read_dir(&self.temp_dir).await {
            Ok(mut entries) => entries.next_entry().await.unwrap().is_none(),
            Err(_) => true,
        }
    }
}
