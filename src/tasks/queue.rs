//! Background job queue with bounded concurrency
//!
//! Jobs are submitted over a bounded channel and processed by a single worker
//! task that runs at most `max_concurrent` of them at a time.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::ThumbnailError;

/// Configuration for a job queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQueueConfig {
    /// Maximum concurrent jobs
    pub max_concurrent: usize,
    /// Queue capacity (pending jobs)
    pub queue_capacity: usize,
    /// Delay between processing jobs (for rate limiting)
    pub job_delay: Duration,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            queue_capacity: 1000,
            job_delay: Duration::ZERO,
        }
    }
}

/// A queued payload with its id
pub struct Job<T> {
    pub id: Uuid,
    pub payload: T,
}

impl<T> Job<T> {
    pub fn new(payload: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
        }
    }
}

/// A bounded work queue that processes jobs with limited concurrency
pub struct WorkQueue<T> {
    sender: Mutex<Option<mpsc::Sender<Job<T>>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    name: String,
}

impl<T: Send + 'static> WorkQueue<T> {
    /// Create a new work queue with a processor function.
    ///
    /// The processor receives the job id and payload.
    pub fn new<F, Fut>(name: &str, config: JobQueueConfig, processor: F) -> Self
    where
        F: Fn(Uuid, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, mut receiver) = mpsc::channel::<Job<T>>(config.queue_capacity.max(1));
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        let job_delay = config.job_delay;
        let queue_name = name.to_string();
        let processor = Arc::new(processor);

        let worker = tokio::spawn(async move {
            info!(queue = %queue_name, "Work queue started");
            let mut running = JoinSet::new();

            while let Some(job) = receiver.recv().await {
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    break;
                };
                let process = processor.clone();
                let name = queue_name.clone();

                running.spawn(async move {
                    let _permit = permit;
                    debug!(queue = %name, job_id = %job.id, "Processing job");
                    process(job.id, job.payload).await;
                    debug!(queue = %name, job_id = %job.id, "Job completed");
                });

                while let Some(finished) = running.try_join_next() {
                    if let Err(e) = finished {
                        error!(queue = %queue_name, error = %e, "Job task failed");
                    }
                }

                if job_delay > Duration::ZERO {
                    tokio::time::sleep(job_delay).await;
                }
            }

            while let Some(finished) = running.join_next().await {
                if let Err(e) = finished {
                    error!(queue = %queue_name, error = %e, "Job task failed");
                }
            }

            info!(queue = %queue_name, "Work queue stopped");
        });

        Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submit a job to the queue, waiting for room if it is full
    pub async fn submit(&self, payload: T) -> Result<Uuid, ThumbnailError> {
        let sender = self.sender.lock().clone().ok_or_else(|| self.closed())?;

        let job = Job::new(payload);
        let id = job.id;
        sender.send(job).await.map_err(|_| self.closed())?;
        debug!(queue = %self.name, job_id = %id, "Job submitted");
        Ok(id)
    }

    /// Stop accepting jobs and wait until every submitted job has finished
    pub async fn shutdown(&self) {
        drop(self.sender.lock().take());

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(queue = %self.name, error = %e, "Work queue worker failed");
            }
        }
    }

    fn closed(&self) -> ThumbnailError {
        ThumbnailError::QueueClosed {
            queue: self.name.clone(),
        }
    }
}
