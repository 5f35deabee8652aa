use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use crate::core::error::Result;
use crate::features::uploads::models::{NewUploadRecord, UploadRecord};

/// Persists metadata of remotely stored uploads
///
/// Records are only ever inserted; nothing here updates or deletes them.
#[async_trait]
pub trait UploadRecordRepository: Send + Sync {
    async fn create(&self, record: NewUploadRecord) -> Result<UploadRecord>;
}

pub struct PgUploadRecordRepository {
    pool: PgPool,
}

impl PgUploadRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UploadRecordRepository for PgUploadRecordRepository {
    async fn create(&self, record: NewUploadRecord) -> Result<UploadRecord> {
        let created = sqlx::query_as::<_, UploadRecord>(
            r#"
            INSERT INTO upload_records (name, tags, image_url, public_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, tags, image_url, public_id, created_at, updated_at
            "#,
        )
        .bind(&record.name)
        .bind(&record.tags)
        .bind(&record.image_url)
        .bind(&record.public_id)
        .fetch_one(&self.pool)
        .await?;

        info!(
            "Upload record saved: id={}, name={}, public_id={:?}",
            created.id, created.name, created.public_id
        );

        Ok(created)
    }
}
