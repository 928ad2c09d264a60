//! Application configuration management

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;

use crate::cli::CliOptions;
use crate::error::ThumbnailError;
use crate::logging::LogFormat;
use crate::tasks::queue::JobQueueConfig;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL (e.g. `sqlite:video_thumbnails.db` or `sqlite::memory:`)
    pub database_url: String,

    /// Maximum pool size
    pub max_connections: u32,

    /// How long to keep retrying the initial connection
    pub connect_timeout: Duration,

    pub log_format: LogFormat,

    /// Cron expression (with seconds) for periodic runs; `None` runs once
    pub schedule: Option<String>,

    /// Work queue feeding the background job table
    pub task_queue: JobQueueConfig,

    /// Priority stamped on queued thumbnail jobs
    pub task_priority: i32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Prefer DATABASE_PATH, fall back to DATABASE_URL
        let database_url = env::var("DATABASE_PATH")
            .or_else(|_| env::var("DATABASE_URL"))
            .map(|value| normalize_database_url(&value))
            .unwrap_or_else(|_| "sqlite:video_thumbnails.db".to_string());

        let defaults = JobQueueConfig::default();

        Ok(Self {
            database_url,

            max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 5)?,

            connect_timeout: Duration::from_secs(parse_env("DB_CONNECT_TIMEOUT_SECS", 30)?),

            log_format: parse_env("LOG_FORMAT", LogFormat::Json)?,

            schedule: env::var("THUMBNAIL_SCHEDULE").ok().filter(|s| !s.trim().is_empty()),

            task_queue: JobQueueConfig {
                max_concurrent: parse_env("TASK_QUEUE_MAX_CONCURRENT", defaults.max_concurrent)?,
                queue_capacity: parse_env("TASK_QUEUE_CAPACITY", defaults.queue_capacity)?,
                job_delay: Duration::from_millis(parse_env(
                    "TASK_QUEUE_JOB_DELAY_MS",
                    defaults.job_delay.as_millis() as u64,
                )?),
            },

            task_priority: parse_env("TASK_PRIORITY", 0)?,
        })
    }

    /// Apply command-line overrides on top of the environment
    pub fn with_cli(mut self, cli: &CliOptions) -> Self {
        if let Some(url) = &cli.database_url {
            self.database_url = normalize_database_url(url);
        }
        if let Some(format) = cli.log_format {
            self.log_format = format;
        }
        if let Some(schedule) = &cli.schedule {
            self.schedule = Some(schedule.clone());
        }
        self
    }
}

/// Accept a bare file path as well as a `sqlite:` URL
pub fn normalize_database_url(value: &str) -> String {
    if value.starts_with("sqlite:") {
        value.to_string()
    } else {
        format!("sqlite:{}", value)
    }
}

fn parse_env<T: FromStr>(key: &'static str, default: T) -> Result<T, ThumbnailError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ThumbnailError::InvalidConfig { key, value }),
        _ => Ok(default),
    }
}
