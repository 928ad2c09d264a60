//! Thumbnail update jobs and their dispatch

pub mod dispatch;
pub mod in_flight;
pub mod queue;

use std::future::Future;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::catalog::CourseVideoId;
use crate::error::ThumbnailError;

pub use dispatch::QueueDispatcher;
pub use in_flight::InFlight;
pub use queue::{JobQueueConfig, WorkQueue};

/// Job payload consumed by the thumbnail worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateThumbnailsJob {
    pub course_videos: Vec<CourseVideoId>,
    pub commit: bool,
    pub command_run: i64,
    pub force_update: bool,
}

impl UpdateThumbnailsJob {
    pub const JOB_NAME: &'static str = "update_video_thumbnails";
}

/// A batch handed to [TaskDispatcher::enqueue_update_thumbnail_tasks]
#[derive(Debug, Clone)]
pub struct EnqueueRequest {
    pub course_videos: Vec<CourseVideoId>,
    pub commit: bool,
    pub command_run: i64,
    pub force_update: bool,
    /// Videos per queued job
    pub videos_per_task: usize,
}

impl EnqueueRequest {
    /// Split the batch into jobs of at most `videos_per_task` videos
    pub fn into_jobs(self) -> Vec<UpdateThumbnailsJob> {
        let chunk_size = self.videos_per_task.max(1);
        self.course_videos
            .chunks(chunk_size)
            .map(|chunk| UpdateThumbnailsJob {
                course_videos: chunk.to_vec(),
                commit: self.commit,
                command_run: self.command_run,
                force_update: self.force_update,
            })
            .collect()
    }
}

/// Handle to an in-flight dispatch. Dropping it does not cancel the dispatch.
#[derive(Debug)]
pub struct DispatchHandle {
    inner: JoinHandle<Result<Vec<Uuid>>>,
}

impl DispatchHandle {
    /// Run `dispatch` on the runtime in the background
    pub fn spawn<F>(dispatch: F) -> Self
    where
        F: Future<Output = Result<Vec<Uuid>>> + Send + 'static,
    {
        Self {
            inner: tokio::spawn(dispatch),
        }
    }

    /// A dispatch that already completed with `ids`
    pub fn ready(ids: Vec<Uuid>) -> Self {
        Self::spawn(async move { Ok(ids) })
    }

    /// Wait for the dispatch and return the ids of the submitted jobs
    pub async fn wait(self) -> Result<Vec<Uuid>> {
        self.inner.await.map_err(ThumbnailError::from)?
    }
}

/// Asynchronous submission of thumbnail update jobs
pub trait TaskDispatcher: Send + Sync {
    /// Start dispatching `request` and return without waiting for it
    fn enqueue_update_thumbnail_tasks(&self, request: EnqueueRequest) -> DispatchHandle;
}
