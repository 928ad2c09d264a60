//! Typed errors for task dispatch and configuration

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// The work queue stopped accepting jobs
    #[error("work queue '{queue}' is closed")]
    QueueClosed { queue: String },

    /// The background dispatch task panicked or was cancelled
    #[error("dispatch task failed: {0}")]
    DispatchJoin(#[from] tokio::task::JoinError),

    #[error("invalid value for {key}: {value:?}")]
    InvalidConfig { key: &'static str, value: String },
}
