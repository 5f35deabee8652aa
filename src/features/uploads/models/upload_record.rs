use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for upload records
#[derive(Debug, Clone, FromRow)]
pub struct UploadRecord {
    pub id: Uuid,
    pub name: String,
    pub tags: String,
    pub image_url: String,
    pub public_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when recording a new upload; id and timestamps are defaulted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUploadRecord {
    pub name: String,
    pub tags: String,
    pub image_url: String,
    pub public_id: Option<String>,
}
