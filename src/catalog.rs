//! Catalog of course videos eligible for YouTube thumbnails

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A course video with a YouTube encoding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseVideoId {
    pub course_id: String,
    pub edx_video_id: String,
    pub youtube_url: String,
}

impl CourseVideoId {
    pub fn new(
        course_id: impl Into<String>,
        edx_video_id: impl Into<String>,
        youtube_url: impl Into<String>,
    ) -> Self {
        Self {
            course_id: course_id.into(),
            edx_video_id: edx_video_id.into(),
            youtube_url: youtube_url.into(),
        }
    }

    /// `(course_id, edx_video_id)`, the identity used for deduplication
    pub fn key(&self) -> (&str, &str) {
        (&self.course_id, &self.edx_video_id)
    }
}

/// Lookup of course videos that have a YouTube profile
#[async_trait]
pub trait VideoCatalog: Send + Sync {
    /// Eligible course videos in catalog order.
    ///
    /// `None` or an empty slice means every course.
    async fn course_video_ids_with_youtube_profile(
        &self,
        course_ids: Option<&[String]>,
    ) -> Result<Vec<CourseVideoId>>;
}
