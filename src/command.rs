//! The video thumbnails command: select a batch, enqueue it, record it

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::catalog::VideoCatalog;
use crate::db::{DRY_RUN_NUMBER, Database};
use crate::selector::command_options;
use crate::tasks::{DispatchHandle, EnqueueRequest, TaskDispatcher};

/// Outcome of one [VideoThumbnailsCommand::handle] call
#[derive(Debug)]
pub struct RunReport {
    /// New run number, or -1 for a dry run
    pub command_run: i64,
    pub batch_len: usize,
    pub force_update: bool,
    /// Rows written to `updated_course_videos`
    pub marked_updated: u64,
    /// Dispatch still in flight when `handle` returned
    pub dispatch: DispatchHandle,
}

/// Adds thumbnails from YouTube to videos
#[derive(Clone)]
pub struct VideoThumbnailsCommand {
    db: Database,
    catalog: Arc<dyn VideoCatalog>,
    dispatcher: Arc<dyn TaskDispatcher>,
}

impl VideoThumbnailsCommand {
    pub fn new(db: Database, catalog: Arc<dyn VideoCatalog>, dispatcher: Arc<dyn TaskDispatcher>) -> Self {
        Self {
            db,
            catalog,
            dispatcher,
        }
    }

    /// Run once.
    ///
    /// `from_settings` allows the run to mark its batch as updated when the
    /// current settings commit and have `all_videos` set. Nothing is retried
    /// or rolled back: if marking fails after the batch was dispatched, the
    /// error is returned while the dispatch keeps running.
    /// [QueueDispatcher::shutdown](crate::tasks::QueueDispatcher::shutdown)
    /// waits for it.
    pub async fn handle(&self, from_settings: bool) -> Result<RunReport> {
        let settings = self.db.thumbnail_settings().current().await?;
        let options = command_options(&settings, self.catalog.as_ref(), &self.db).await?;

        let command_run = if options.commit {
            self.db
                .thumbnail_settings()
                .increment_run()
                .await
                .context("Failed to advance the command run")?
        } else {
            DRY_RUN_NUMBER
        };

        let batch_len = options.batch.len();
        let dispatch = self.dispatcher.enqueue_update_thumbnail_tasks(EnqueueRequest {
            course_videos: options.batch.clone(),
            commit: options.commit,
            command_run,
            force_update: options.force_update,
            videos_per_task: settings.task_chunk_size(),
        });

        let marked_updated = if options.commit && from_settings && settings.all_videos {
            self.db
                .updated_course_videos()
                .bulk_create(&options.batch, command_run)
                .await
                .inspect_err(|e| {
                    warn!(command_run, error = %e, "Batch dispatched but not marked as updated");
                })?
        } else {
            0
        };

        info!(
            command_run,
            batch = batch_len,
            commit = options.commit,
            force_update = options.force_update,
            from_settings,
            marked_updated,
            "Video thumbnail tasks enqueued"
        );

        Ok(RunReport {
            command_run,
            batch_len,
            force_update: options.force_update,
            marked_updated,
            dispatch,
        })
    }
}
