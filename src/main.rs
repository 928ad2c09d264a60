//! Video thumbnails command entry point
//!
//! Runs once by default; with `--schedule` it keeps running and repeats the
//! command on the cron schedule until interrupted.

use std::sync::Arc;

use tracing::info;

use video_thumbnails::cli::CliOptions;
use video_thumbnails::config::Config;
use video_thumbnails::db::connect_with_retry;
use video_thumbnails::tasks::QueueDispatcher;
use video_thumbnails::{VideoThumbnailsCommand, logging, scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so the log format is known before tracing starts
    dotenvy::dotenv().ok();
    let cli = CliOptions::from_args();
    let config = Config::from_env()?.with_cli(&cli);

    logging::init(config.log_format);
    info!("Starting video thumbnails");

    let db = connect_with_retry(&config.database_url, config.max_connections, config.connect_timeout).await?;
    db.prepare().await?;
    info!("Database connected");

    let dispatcher = Arc::new(QueueDispatcher::with_job_store(
        db.background_jobs(),
        config.task_queue.clone(),
        config.task_priority,
    ));
    let command = VideoThumbnailsCommand::new(db.clone(), Arc::new(db.course_videos()), dispatcher.clone());

    let outcome = match config.schedule.as_deref() {
        Some(cron) => run_on_schedule(command, cron, cli.from_settings).await,
        None => run_once(&command, cli.from_settings).await,
    };

    // Dispatches outlive a failed run; let their jobs reach the job table
    // before reporting the failure
    dispatcher.shutdown().await;
    db.close().await;

    outcome
}

async fn run_on_schedule(command: VideoThumbnailsCommand, cron: &str, from_settings: bool) -> anyhow::Result<()> {
    let mut scheduler = scheduler::start_scheduler(command, cron, from_settings).await?;
    let signal = tokio::signal::ctrl_c().await;
    info!("Shutting down scheduler");
    scheduler.shutdown().await?;
    Ok(signal?)
}

async fn run_once(command: &VideoThumbnailsCommand, from_settings: bool) -> anyhow::Result<()> {
    let report = command.handle(from_settings).await?;
    let jobs = report.dispatch.wait().await?;
    info!(
        command_run = report.command_run,
        videos = report.batch_len,
        jobs = jobs.len(),
        "Video thumbnails run complete"
    );
    Ok(())
}
