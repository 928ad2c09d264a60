//! Updated course video records
//!
//! One row per course video already handed to the thumbnail queue by a
//! committed run. Rows are only ever inserted.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;

use crate::catalog::CourseVideoId;
use crate::db::sqlite_helpers::{now_iso8601, str_to_datetime};

/// A course video marked as updated by a committed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedCourseVideoRecord {
    pub id: i64,
    pub course_id: String,
    pub edx_video_id: String,
    pub command_run: i64,
    pub created_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, SqliteRow> for UpdatedCourseVideoRecord {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let created_str: String = row.try_get("created_at")?;

        Ok(Self {
            id: row.try_get("id")?,
            course_id: row.try_get("course_id")?,
            edx_video_id: row.try_get("edx_video_id")?,
            command_run: row.try_get("command_run")?,
            created_at: str_to_datetime(&created_str).map_err(|e| sqlx::Error::Decode(e.into()))?,
        })
    }
}

/// Repository for the `updated_course_videos` table
pub struct UpdatedCourseVideoRepository {
    pool: SqlitePool,
}

impl UpdatedCourseVideoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All `(course_id, edx_video_id)` pairs already updated
    pub async fn list_keys(&self) -> Result<HashSet<(String, String)>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT course_id, edx_video_id FROM updated_course_videos")
                .fetch_all(&self.pool)
                .await
                .context("Failed to load updated course videos")?;

        Ok(rows.into_iter().collect())
    }

    /// Records stamped with a given run number
    pub async fn list_by_run(&self, command_run: i64) -> Result<Vec<UpdatedCourseVideoRecord>> {
        let records = sqlx::query_as::<_, UpdatedCourseVideoRecord>(
            "SELECT * FROM updated_course_videos WHERE command_run = ?1 ORDER BY id",
        )
        .bind(command_run)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM updated_course_videos")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Insert one record per course video in a single transaction.
    ///
    /// A pair that is already recorded fails the whole insert.
    pub async fn bulk_create(&self, course_videos: &[CourseVideoId], command_run: i64) -> Result<u64> {
        if course_videos.is_empty() {
            return Ok(0);
        }

        let created_at = now_iso8601();
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for video in course_videos {
            let result = sqlx::query(
                r#"
                INSERT INTO updated_course_videos (course_id, edx_video_id, command_run, created_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(&video.course_id)
            .bind(&video.edx_video_id)
            .bind(command_run)
            .bind(&created_at)
            .execute(&mut *tx)
            .await
            .with_context(|| {
                format!(
                    "Failed to mark {}/{} as updated",
                    video.course_id, video.edx_video_id
                )
            })?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;

        Ok(inserted)
    }
}
