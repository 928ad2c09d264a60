//! Queue-backed dispatcher that hands jobs to the external worker
//!
//! Each job goes through a [WorkQueue] whose processor writes it to the
//! `background_jobs` table.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};
use uuid::Uuid;

use super::in_flight::InFlight;
use super::queue::{JobQueueConfig, WorkQueue};
use super::{DispatchHandle, EnqueueRequest, TaskDispatcher, UpdateThumbnailsJob};
use crate::db::BackgroundJobRepository;
use crate::error::ThumbnailError;

/// Queue name used in logs
pub const THUMBNAIL_QUEUE: &str = "video_thumbnails";

/// Thumbnail update work queue
pub type ThumbnailQueue = WorkQueue<UpdateThumbnailsJob>;

pub struct QueueDispatcher {
    queue: Arc<ThumbnailQueue>,
    dispatches: InFlight,
}

impl QueueDispatcher {
    pub fn new(queue: Arc<ThumbnailQueue>) -> Self {
        Self {
            queue,
            dispatches: InFlight::new(),
        }
    }

    /// Dispatcher whose queue persists jobs to `background_jobs`
    pub fn with_job_store(jobs: BackgroundJobRepository, config: JobQueueConfig, priority: i32) -> Self {
        let queue = WorkQueue::new(THUMBNAIL_QUEUE, config, move |id, job: UpdateThumbnailsJob| {
            let jobs = jobs.clone();
            async move {
                if let Err(e) = persist_job(&jobs, id, &job, priority).await {
                    error!(
                        job_id = %id,
                        command_run = job.command_run,
                        videos = job.course_videos.len(),
                        error = %e,
                        "Failed to queue thumbnail job"
                    );
                }
            }
        });

        Self::new(Arc::new(queue))
    }

    /// Wait for every dispatch, including ones whose handle was dropped,
    /// then for every submitted job to be processed.
    pub async fn shutdown(&self) {
        self.dispatches.close().await;
        self.queue.shutdown().await;
    }
}

impl TaskDispatcher for QueueDispatcher {
    fn enqueue_update_thumbnail_tasks(&self, request: EnqueueRequest) -> DispatchHandle {
        let queue = self.queue.clone();
        let Some(permit) = self.dispatches.enter() else {
            let closed = ThumbnailError::QueueClosed {
                queue: queue.name().to_string(),
            };
            return DispatchHandle::spawn(async move { Result::<Vec<Uuid>>::Err(closed.into()) });
        };

        DispatchHandle::spawn(async move {
            let _permit = permit;
            let command_run = request.command_run;
            let videos = request.course_videos.len();
            let jobs = request.into_jobs();

            let mut ids = Vec::with_capacity(jobs.len());
            for job in jobs {
                ids.push(queue.submit(job).await?);
            }

            info!(
                queue = %queue.name(),
                command_run,
                videos,
                jobs = ids.len(),
                "Thumbnail jobs submitted"
            );
            Ok(ids)
        })
    }
}

async fn persist_job(
    jobs: &BackgroundJobRepository,
    id: Uuid,
    job: &UpdateThumbnailsJob,
    priority: i32,
) -> Result<()> {
    let data = serde_json::to_value(job)?;
    jobs.insert(id, UpdateThumbnailsJob::JOB_NAME, &data, priority).await
}
