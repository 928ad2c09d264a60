//! Database connection and operations

pub mod background_jobs;
pub mod course_videos;
pub mod schema;
pub mod seed;
pub mod sqlite_helpers;
pub mod thumbnail_settings;
pub mod updated_videos;

use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{info, warn};

pub use background_jobs::{BackgroundJobRecord, BackgroundJobRepository};
pub use course_videos::{CourseVideoRepository, YOUTUBE_PROFILE};
pub use thumbnail_settings::{DRY_RUN_NUMBER, RunSettings, ThumbnailSettingsRepository};
pub use updated_videos::{UpdatedCourseVideoRecord, UpdatedCourseVideoRepository};

/// Delay between connection attempts in [connect_with_retry]
const RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// Database wrapper providing connection pool access
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database wrapper from an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new database connection pool, creating the file if missing
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database URL '{}'", url))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;

        Ok(Self::new(pool))
    }

    /// Single-connection in-memory database (every connection to
    /// `sqlite::memory:` would otherwise see its own empty database)
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self::new(pool))
    }

    /// Create missing tables and seed the first settings version
    pub async fn prepare(&self) -> Result<()> {
        let sync_result = schema::sync_schema(&self.pool).await;
        if !sync_result.tables_created.is_empty() {
            info!(tables = ?sync_result.tables_created, "Created tables");
        }
        if let Some(err) = sync_result.errors.first() {
            anyhow::bail!("Schema bootstrap failed: {}", err);
        }

        let seed_result = seed::run_seeds(&self.pool).await;
        for err in &seed_result.errors {
            warn!(error = %err, "Seed error");
        }

        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Get a thumbnail settings repository
    pub fn thumbnail_settings(&self) -> ThumbnailSettingsRepository {
        ThumbnailSettingsRepository::new(self.pool.clone())
    }

    /// Get an updated course videos repository
    pub fn updated_course_videos(&self) -> UpdatedCourseVideoRepository {
        UpdatedCourseVideoRepository::new(self.pool.clone())
    }

    /// Get the course video catalog
    pub fn course_videos(&self) -> CourseVideoRepository {
        CourseVideoRepository::new(self.pool.clone())
    }

    /// Get a background jobs repository
    pub fn background_jobs(&self) -> BackgroundJobRepository {
        BackgroundJobRepository::new(self.pool.clone())
    }
}

/// Connect, retrying every few seconds until `timeout` has elapsed
pub async fn connect_with_retry(url: &str, max_connections: u32, timeout: Duration) -> Result<Database> {
    let started = Instant::now();
    loop {
        match Database::connect(url, max_connections).await {
            Ok(db) => return Ok(db),
            Err(e) if started.elapsed() + RETRY_INTERVAL < timeout => {
                warn!(
                    error = %e,
                    retry_in_secs = RETRY_INTERVAL.as_secs(),
                    "Database connection failed, retrying"
                );
                tokio::time::sleep(RETRY_INTERVAL).await;
            }
            Err(e) => {
                return Err(e).context(format!(
                    "Database connection failed after {}s",
                    started.elapsed().as_secs()
                ));
            }
        }
    }
}
