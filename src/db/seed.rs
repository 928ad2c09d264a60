//! Pre-seed data for initial database setup.
//!
//! Inserts the first `video_thumbnail_settings` version when the table is
//! empty. Re-runs are idempotent: an existing version is never touched.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::sqlite_helpers::now_iso8601;

/// Result of running seed operations.
#[derive(Debug, Default)]
pub struct SeedResult {
    pub tables_seeded: Vec<String>,
    pub errors: Vec<String>,
}

/// Seed a disabled-by-default settings version (dry run, empty batch).
async fn seed_thumbnail_settings(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO video_thumbnail_settings (
            change_date, all_course_videos, course_ids, batch_size, videos_per_task,
            force_update, commit_changes, all_videos, command_run
        )
        SELECT ?1, 0, '', 0, 50, 0, 0, 0, 0
        WHERE NOT EXISTS (SELECT 1 FROM video_thumbnail_settings)
        "#,
    )
    .bind(now_iso8601())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn run_seeds(pool: &SqlitePool) -> SeedResult {
    let mut result = SeedResult::default();

    match seed_thumbnail_settings(pool).await {
        Ok(n) if n > 0 => {
            result
                .tables_seeded
                .push(format!("video_thumbnail_settings ({} rows)", n));
        }
        Ok(_) => {}
        Err(e) => {
            let msg = format!("Seed video_thumbnail_settings: {}", e);
            warn!("{}", msg);
            result.errors.push(msg);
        }
    }

    if !result.tables_seeded.is_empty() {
        info!(tables = ?result.tables_seeded, "Pre-seed data applied");
    }

    result
}
