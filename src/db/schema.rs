//! Schema bootstrap for the thumbnail command's tables
//!
//! Tables are created with `CREATE TABLE IF NOT EXISTS`, so running the
//! bootstrap against an existing database is a no-op. Column renames or type
//! changes are not handled here.

use sqlx::SqlitePool;
use tracing::{debug, warn};

/// Result of a schema bootstrap run
#[derive(Debug, Default)]
pub struct SchemaSyncResult {
    pub tables_created: Vec<String>,
    pub errors: Vec<String>,
}

/// Table name and its DDL, in creation order.
const TABLES: &[(&str, &str)] = &[
    (
        "video_thumbnail_settings",
        r#"CREATE TABLE IF NOT EXISTS video_thumbnail_settings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            change_date TEXT NOT NULL,
            all_course_videos INTEGER NOT NULL DEFAULT 0,
            course_ids TEXT NOT NULL DEFAULT '',
            batch_size INTEGER NOT NULL DEFAULT 0,
            videos_per_task INTEGER NOT NULL DEFAULT 50,
            force_update INTEGER NOT NULL DEFAULT 0,
            commit_changes INTEGER NOT NULL DEFAULT 0,
            all_videos INTEGER NOT NULL DEFAULT 0,
            command_run INTEGER NOT NULL DEFAULT 0
        )"#,
    ),
    (
        "updated_course_videos",
        r#"CREATE TABLE IF NOT EXISTS updated_course_videos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id TEXT NOT NULL,
            edx_video_id TEXT NOT NULL,
            command_run INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (course_id, edx_video_id)
        )"#,
    ),
    (
        "course_videos",
        r#"CREATE TABLE IF NOT EXISTS course_videos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id TEXT NOT NULL,
            edx_video_id TEXT NOT NULL,
            UNIQUE (course_id, edx_video_id)
        )"#,
    ),
    (
        "encoded_videos",
        r#"CREATE TABLE IF NOT EXISTS encoded_videos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            edx_video_id TEXT NOT NULL,
            profile_name TEXT NOT NULL,
            url TEXT NOT NULL
        )"#,
    ),
    (
        "background_jobs",
        r#"CREATE TABLE IF NOT EXISTS background_jobs (
            id TEXT PRIMARY KEY,
            job_type TEXT NOT NULL,
            data TEXT NOT NULL,
            priority INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'queued',
            created_at TEXT NOT NULL
        )"#,
    ),
];

/// Check if a table exists in the database
pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool, sqlx::Error> {
    let result: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(table_name)
            .fetch_optional(pool)
            .await?;

    Ok(result.is_some())
}

/// Create every table the command reads or writes.
///
/// Errors are collected rather than returned so one bad statement does not
/// hide the state of the others.
pub async fn sync_schema(pool: &SqlitePool) -> SchemaSyncResult {
    let mut result = SchemaSyncResult::default();

    for (table, ddl) in TABLES {
        let existed = table_exists(pool, table).await.unwrap_or(false);
        match sqlx::query(ddl).execute(pool).await {
            Ok(_) if !existed => {
                debug!(table = table, "Created table");
                result.tables_created.push(table.to_string());
            }
            Ok(_) => {}
            Err(e) => {
                let msg = format!("Failed to create table {}: {}", table, e);
                warn!("{}", msg);
                result.errors.push(msg);
            }
        }
    }

    const INDEXES: &[&str] = &[
        "CREATE INDEX IF NOT EXISTS idx_encoded_videos_profile ON encoded_videos (profile_name, edx_video_id)",
        "CREATE INDEX IF NOT EXISTS idx_background_jobs_status ON background_jobs (status, priority)",
    ];
    for stmt in INDEXES {
        if let Err(e) = sqlx::query(stmt).execute(pool).await {
            let msg = format!("Failed to create index: {}", e);
            warn!("{}", msg);
            result.errors.push(msg);
        }
    }

    result
}
