//! Background job handoff table
//!
//! Jobs written here are picked up by the external thumbnail worker.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use crate::db::sqlite_helpers::{now_iso8601, str_to_datetime, str_to_uuid, uuid_to_str};

/// A queued background job
#[derive(Debug, Clone)]
pub struct BackgroundJobRecord {
    pub id: Uuid,
    pub job_type: String,
    pub data: JsonValue,
    pub priority: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, SqliteRow> for BackgroundJobRecord {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let id_str: String = row.try_get("id")?;
        let data_str: String = row.try_get("data")?;
        let created_str: String = row.try_get("created_at")?;

        Ok(Self {
            id: str_to_uuid(&id_str).map_err(|e| sqlx::Error::Decode(e.into()))?,
            job_type: row.try_get("job_type")?,
            data: serde_json::from_str(&data_str).map_err(|e| sqlx::Error::Decode(e.into()))?,
            priority: row.try_get("priority")?,
            status: row.try_get("status")?,
            created_at: str_to_datetime(&created_str).map_err(|e| sqlx::Error::Decode(e.into()))?,
        })
    }
}

/// Repository for the `background_jobs` table
#[derive(Clone)]
pub struct BackgroundJobRepository {
    pool: SqlitePool,
}

impl BackgroundJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Queue a job under a known id
    pub async fn insert(&self, id: Uuid, job_type: &str, data: &JsonValue, priority: i32) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO background_jobs (id, job_type, data, priority, status, created_at)
            VALUES (?1, ?2, ?3, ?4, 'queued', ?5)
            "#,
        )
        .bind(uuid_to_str(id))
        .bind(job_type)
        .bind(serde_json::to_string(data)?)
        .bind(priority)
        .bind(now_iso8601())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Jobs of one type, oldest first
    pub async fn list_by_type(&self, job_type: &str) -> Result<Vec<BackgroundJobRecord>> {
        let records = sqlx::query_as::<_, BackgroundJobRecord>(
            "SELECT * FROM background_jobs WHERE job_type = ?1 ORDER BY created_at, rowid",
        )
        .bind(job_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
