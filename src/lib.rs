//! Video thumbnails - selects course videos that still need YouTube
//! thumbnails and enqueues update jobs for them.

pub mod catalog;
pub mod cli;
pub mod command;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod selector;
pub mod tasks;

pub use catalog::{CourseVideoId, VideoCatalog};
pub use command::{RunReport, VideoThumbnailsCommand};
pub use error::ThumbnailError;
