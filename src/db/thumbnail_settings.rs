//! Versioned run settings for the thumbnail command
//!
//! Every change inserts a new row; the row with the greatest id is the
//! current version. The run counter lives on the same row, so advancing it
//! also creates a version.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;

use crate::db::sqlite_helpers::{now_iso8601, str_to_datetime};

/// Run number emitted for invocations that do not commit.
pub const DRY_RUN_NUMBER: i64 = -1;

/// One version of the administrative settings that govern a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Row id; `None` for the unsaved default returned on an empty table
    pub id: Option<i64>,
    pub change_date: Option<DateTime<Utc>>,
    /// Select from every eligible course video instead of `course_ids`
    pub all_course_videos: bool,
    /// Space-delimited course identifiers
    pub course_ids: String,
    pub batch_size: i64,
    /// Number of videos carried by a single queued job
    pub videos_per_task: i64,
    pub force_update: bool,
    pub commit: bool,
    /// Mark dispatched videos as updated (only with `--from-settings`)
    pub all_videos: bool,
    pub command_run: i64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            id: None,
            change_date: None,
            all_course_videos: false,
            course_ids: String::new(),
            batch_size: 0,
            videos_per_task: 50,
            force_update: false,
            commit: false,
            all_videos: false,
            command_run: 0,
        }
    }
}

impl RunSettings {
    /// Configured course ids, split on whitespace
    pub fn course_id_list(&self) -> Vec<String> {
        self.course_ids.split_whitespace().map(str::to_string).collect()
    }

    /// Batch size as a length; negative values select nothing
    pub fn batch_limit(&self) -> usize {
        usize::try_from(self.batch_size).unwrap_or(0)
    }

    /// Chunk size for queued jobs, never zero
    pub fn task_chunk_size(&self) -> usize {
        usize::try_from(self.videos_per_task).unwrap_or(0).max(1)
    }
}

impl sqlx::FromRow<'_, SqliteRow> for RunSettings {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let change_date: String = row.try_get("change_date")?;

        Ok(Self {
            id: Some(row.try_get("id")?),
            change_date: Some(
                str_to_datetime(&change_date).map_err(|e| sqlx::Error::Decode(e.into()))?,
            ),
            all_course_videos: row.try_get("all_course_videos")?,
            course_ids: row.try_get("course_ids")?,
            batch_size: row.try_get("batch_size")?,
            videos_per_task: row.try_get("videos_per_task")?,
            force_update: row.try_get("force_update")?,
            commit: row.try_get("commit_changes")?,
            all_videos: row.try_get("all_videos")?,
            command_run: row.try_get("command_run")?,
        })
    }
}

const SELECT_CURRENT: &str =
    "SELECT * FROM video_thumbnail_settings ORDER BY id DESC LIMIT 1";

const INSERT_VERSION: &str = r#"
    INSERT INTO video_thumbnail_settings (
        change_date, all_course_videos, course_ids, batch_size, videos_per_task,
        force_update, commit_changes, all_videos, command_run
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
"#;

/// Repository for the `video_thumbnail_settings` table
pub struct ThumbnailSettingsRepository {
    pool: SqlitePool,
}

impl ThumbnailSettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Current settings version, or the unsaved default when none exists
    pub async fn current(&self) -> Result<RunSettings> {
        let record = sqlx::query_as::<_, RunSettings>(SELECT_CURRENT)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load current thumbnail settings")?;

        Ok(record.unwrap_or_default())
    }

    /// Store `settings` as the new current version.
    ///
    /// `id` and `change_date` on the input are ignored; the stored copy is
    /// returned.
    pub async fn save(&self, settings: &RunSettings) -> Result<RunSettings> {
        let result = sqlx::query(INSERT_VERSION)
            .bind(now_iso8601())
            .bind(settings.all_course_videos)
            .bind(&settings.course_ids)
            .bind(settings.batch_size)
            .bind(settings.videos_per_task)
            .bind(settings.force_update)
            .bind(settings.commit)
            .bind(settings.all_videos)
            .bind(settings.command_run)
            .execute(&self.pool)
            .await
            .context("Failed to save thumbnail settings")?;

        let id = result.last_insert_rowid();
        sqlx::query_as::<_, RunSettings>("SELECT * FROM video_thumbnail_settings WHERE id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to retrieve thumbnail settings after insert")
    }

    /// Advance the run counter and return the new run number.
    ///
    /// Reads the latest version and writes its successor in one transaction.
    pub async fn increment_run(&self) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, RunSettings>(SELECT_CURRENT)
            .fetch_optional(&mut *tx)
            .await?
            .unwrap_or_default();
        let next_run = current.command_run + 1;

        sqlx::query(INSERT_VERSION)
            .bind(now_iso8601())
            .bind(current.all_course_videos)
            .bind(&current.course_ids)
            .bind(current.batch_size)
            .bind(current.videos_per_task)
            .bind(current.force_update)
            .bind(current.commit)
            .bind(current.all_videos)
            .bind(next_run)
            .execute(&mut *tx)
            .await
            .context("Failed to advance thumbnail command run")?;

        tx.commit().await?;

        Ok(next_run)
    }
}
