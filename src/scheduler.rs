//! Periodic runs of the thumbnail command

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::command::VideoThumbnailsCommand;
use crate::tasks::InFlight;

/// Running scheduler plus the runs it has started
pub struct ThumbnailScheduler {
    scheduler: JobScheduler,
    runs: Arc<InFlight>,
}

impl ThumbnailScheduler {
    /// Stop scheduling and wait for runs still in progress, including their
    /// dispatch.
    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        self.scheduler.shutdown().await?;
        self.runs.close().await;
        Ok(())
    }
}

/// Initialize and start a scheduler that runs `command` on `cron`
/// (six fields, seconds first).
pub async fn start_scheduler(
    command: VideoThumbnailsCommand,
    cron: &str,
    from_settings: bool,
) -> anyhow::Result<ThumbnailScheduler> {
    let scheduler = JobScheduler::new().await?;
    let runs = Arc::new(InFlight::new());

    let tick_runs = runs.clone();
    let thumbnails_job = Job::new_async(cron, move |_uuid, _l| {
        let command = command.clone();
        let runs = tick_runs.clone();
        Box::pin(async move {
            let Some(_run) = runs.enter() else {
                warn!("Scheduler shutting down, skipping video thumbnails run");
                return;
            };
            run_scheduled(&command, from_settings).await;
        })
    })?;
    scheduler.add(thumbnails_job).await?;

    scheduler.start().await?;

    info!(schedule = cron, "Job scheduler started");
    Ok(ThumbnailScheduler { scheduler, runs })
}

async fn run_scheduled(command: &VideoThumbnailsCommand, from_settings: bool) {
    info!("Running video thumbnails command");
    match command.handle(from_settings).await {
        Ok(report) => {
            if let Err(e) = report.dispatch.wait().await {
                error!(command_run = report.command_run, "Thumbnail dispatch error: {}", e);
            }
        }
        Err(e) => error!("Video thumbnails error: {:#}", e),
    }
}
