//! Course video catalog database operations

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::catalog::{CourseVideoId, VideoCatalog};
use crate::db::sqlite_helpers::in_list_placeholders;

/// Encoding profile that marks a video as published on YouTube
pub const YOUTUBE_PROFILE: &str = "youtube";

/// Course video catalog backed by `course_videos` and `encoded_videos`
#[derive(Clone)]
pub struct CourseVideoRepository {
    pool: SqlitePool,
}

impl CourseVideoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Attach a video to a course. Existing links are left as they are.
    pub async fn add_course_video(&self, course_id: &str, edx_video_id: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO course_videos (course_id, edx_video_id) VALUES (?1, ?2)")
            .bind(course_id)
            .bind(edx_video_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Record an encoding of a video under a profile
    pub async fn add_encoded_video(&self, edx_video_id: &str, profile_name: &str, url: &str) -> Result<()> {
        sqlx::query("INSERT INTO encoded_videos (edx_video_id, profile_name, url) VALUES (?1, ?2, ?3)")
            .bind(edx_video_id)
            .bind(profile_name)
            .bind(url)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl VideoCatalog for CourseVideoRepository {
    async fn course_video_ids_with_youtube_profile(
        &self,
        course_ids: Option<&[String]>,
    ) -> Result<Vec<CourseVideoId>> {
        let course_ids = course_ids.filter(|ids| !ids.is_empty());

        let mut sql = String::from(
            r#"
            SELECT cv.course_id, cv.edx_video_id,
                (SELECT ev.url FROM encoded_videos ev
                 WHERE ev.edx_video_id = cv.edx_video_id AND ev.profile_name = ?
                 ORDER BY ev.id LIMIT 1) AS youtube_url
            FROM course_videos cv
            WHERE EXISTS (
                SELECT 1 FROM encoded_videos ev
                WHERE ev.edx_video_id = cv.edx_video_id AND ev.profile_name = ?
            )
            "#,
        );
        if let Some(ids) = course_ids {
            sql.push_str(&format!(" AND cv.course_id IN ({})", in_list_placeholders(ids.len())));
        }
        sql.push_str(" ORDER BY cv.id");

        let mut query = sqlx::query_as::<_, (String, String, String)>(&sql)
            .bind(YOUTUBE_PROFILE)
            .bind(YOUTUBE_PROFILE);
        if let Some(ids) = course_ids {
            for id in ids {
                query = query.bind(id);
            }
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to look up course videos with a YouTube profile")?;

        Ok(rows
            .into_iter()
            .map(|(course_id, edx_video_id, youtube_url)| CourseVideoId {
                course_id,
                edx_video_id,
                youtube_url,
            })
            .collect())
    }
}
