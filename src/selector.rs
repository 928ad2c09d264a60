//! Batch selection: which course videos a run hands to the thumbnail queue

use std::collections::HashSet;

use anyhow::Result;
use tracing::info;

use crate::catalog::{CourseVideoId, VideoCatalog};
use crate::db::{Database, RunSettings};

/// Result of filtering the eligible videos against the updated set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSelection {
    pub batch: Vec<CourseVideoId>,
    pub total: usize,
    pub updated: usize,
    pub non_updated: usize,
}

/// What a run dispatches and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOptions {
    pub batch: Vec<CourseVideoId>,
    pub force_update: bool,
    pub commit: bool,
}

/// Drop already-updated videos and keep the first `batch_size` of the rest,
/// in catalog order.
pub fn select_batch(
    all: Vec<CourseVideoId>,
    updated: &HashSet<(String, String)>,
    batch_size: usize,
) -> BatchSelection {
    let total = all.len();
    let updated_keys: HashSet<(&str, &str)> = updated
        .iter()
        .map(|(course_id, edx_video_id)| (course_id.as_str(), edx_video_id.as_str()))
        .collect();
    let non_updated: Vec<CourseVideoId> = all
        .into_iter()
        .filter(|video| !updated_keys.contains(&video.key()))
        .collect();
    let non_updated_count = non_updated.len();

    BatchSelection {
        batch: non_updated.into_iter().take(batch_size).collect(),
        total,
        updated: updated.len(),
        non_updated: non_updated_count,
    }
}

/// Compute the batch and flags for one run. Read-only.
pub async fn command_options(
    settings: &RunSettings,
    catalog: &dyn VideoCatalog,
    db: &Database,
) -> Result<CommandOptions> {
    let batch = if settings.all_course_videos {
        let all = catalog.course_video_ids_with_youtube_profile(None).await?;
        let updated = db.updated_course_videos().list_keys().await?;
        let selection = select_batch(all, &updated, settings.batch_limit());

        info!(
            total = selection.total,
            updated = selection.updated,
            non_updated = selection.non_updated,
            in_process = selection.batch.len(),
            "Video thumbnail batch selected"
        );
        selection.batch
    } else {
        let course_ids = settings.course_id_list();
        catalog
            .course_video_ids_with_youtube_profile(Some(course_ids.as_slice()))
            .await?
    };

    Ok(CommandOptions {
        batch,
        force_update: settings.force_update,
        commit: settings.commit,
    })
}
