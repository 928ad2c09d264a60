//! Integration tests for the video thumbnails command
//!
//! These tests run the command against an in-memory SQLite catalog:
//! - Batch selection in "all course videos" and per-course modes
//! - Run counter and dry runs
//! - Marking dispatched videos as updated
//! - Handoff to the background job table

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use uuid::Uuid;

use video_thumbnails::CourseVideoId;
use video_thumbnails::VideoThumbnailsCommand;
use video_thumbnails::db::{Database, RunSettings, YOUTUBE_PROFILE};
use video_thumbnails::tasks::{
    DispatchHandle, EnqueueRequest, JobQueueConfig, QueueDispatcher, TaskDispatcher,
    UpdateThumbnailsJob,
};

// ============================================================================
// Fixtures
// ============================================================================

/// Dispatcher that records every request instead of queueing it
#[derive(Default)]
struct RecordingDispatcher {
    requests: Mutex<Vec<EnqueueRequest>>,
}

impl RecordingDispatcher {
    fn requests(&self) -> Vec<EnqueueRequest> {
        self.requests.lock().clone()
    }
}

impl TaskDispatcher for RecordingDispatcher {
    fn enqueue_update_thumbnail_tasks(&self, request: EnqueueRequest) -> DispatchHandle {
        self.requests.lock().push(request);
        DispatchHandle::ready(vec![Uuid::new_v4()])
    }
}

async fn test_db() -> Database {
    let db = Database::connect_in_memory().await.unwrap();
    db.prepare().await.unwrap();
    db
}

fn yt(video: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video)
}

/// Catalog: (c1,v1), (c1,v2), (c2,v3) with YouTube encodings, plus a
/// course video without one.
async fn seed_catalog(db: &Database) {
    let catalog = db.course_videos();
    for (course, video) in [("c1", "v1"), ("c1", "v2"), ("c2", "v3"), ("c2", "v4")] {
        catalog.add_course_video(course, video).await.unwrap();
    }
    for video in ["v1", "v2", "v3"] {
        catalog.add_encoded_video(video, YOUTUBE_PROFILE, &yt(video)).await.unwrap();
    }
    catalog
        .add_encoded_video("v4", "desktop_mp4", "https://cdn.example.com/v4.mp4")
        .await
        .unwrap();
}

async fn save_settings(db: &Database, settings: RunSettings) -> RunSettings {
    db.thumbnail_settings().save(&settings).await.unwrap()
}

fn command(db: &Database, dispatcher: Arc<dyn TaskDispatcher>) -> VideoThumbnailsCommand {
    VideoThumbnailsCommand::new(db.clone(), Arc::new(db.course_videos()), dispatcher)
}

fn video(course: &str, id: &str) -> CourseVideoId {
    CourseVideoId::new(course, id, yt(id))
}

fn all_videos_settings(batch_size: i64, commit: bool) -> RunSettings {
    RunSettings {
        all_course_videos: true,
        batch_size,
        commit,
        all_videos: true,
        ..Default::default()
    }
}

// ============================================================================
// Catalog
// ============================================================================

mod catalog {
    use super::*;
    use pretty_assertions::assert_eq;
    use video_thumbnails::VideoCatalog;

    #[tokio::test]
    async fn test_only_youtube_videos_in_insertion_order() {
        let db = test_db().await;
        seed_catalog(&db).await;

        let videos = db
            .course_videos()
            .course_video_ids_with_youtube_profile(None)
            .await
            .unwrap();
        assert_eq!(videos, vec![video("c1", "v1"), video("c1", "v2"), video("c2", "v3")]);
    }

    #[tokio::test]
    async fn test_restricted_to_courses() {
        let db = test_db().await;
        seed_catalog(&db).await;

        let videos = db
            .course_videos()
            .course_video_ids_with_youtube_profile(Some(&["c2".to_string(), "c9".to_string()][..]))
            .await
            .unwrap();
        assert_eq!(videos, vec![video("c2", "v3")]);
    }

    #[tokio::test]
    async fn test_empty_restriction_means_every_course() {
        let db = test_db().await;
        seed_catalog(&db).await;

        let videos = db
            .course_videos()
            .course_video_ids_with_youtube_profile(Some(&[][..]))
            .await
            .unwrap();
        assert_eq!(videos.len(), 3);
    }

    #[tokio::test]
    async fn test_video_with_two_youtube_encodings_listed_once() {
        let db = test_db().await;
        let catalog = db.course_videos();
        catalog.add_course_video("c1", "v1").await.unwrap();
        catalog.add_encoded_video("v1", YOUTUBE_PROFILE, "first").await.unwrap();
        catalog.add_encoded_video("v1", YOUTUBE_PROFILE, "second").await.unwrap();

        let videos = catalog.course_video_ids_with_youtube_profile(None).await.unwrap();
        assert_eq!(videos, vec![CourseVideoId::new("c1", "v1", "first")]);
    }
}

// ============================================================================
// Settings
// ============================================================================

mod settings {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_seeded_default_is_dry_run() {
        let db = test_db().await;
        let current = db.thumbnail_settings().current().await.unwrap();

        assert!(current.id.is_some());
        assert!(!current.commit);
        assert!(!current.all_course_videos);
        assert_eq!(current.command_run, 0);
    }

    #[tokio::test]
    async fn test_latest_version_is_current() {
        let db = test_db().await;
        save_settings(&db, all_videos_settings(5, false)).await;
        let latest = save_settings(&db, all_videos_settings(9, true)).await;

        let current = db.thumbnail_settings().current().await.unwrap();
        assert_eq!(current, latest);
        assert_eq!(current.batch_size, 9);
    }

    #[tokio::test]
    async fn test_increment_run_keeps_settings() {
        let db = test_db().await;
        save_settings(&db, all_videos_settings(4, true)).await;

        assert_eq!(db.thumbnail_settings().increment_run().await.unwrap(), 1);
        assert_eq!(db.thumbnail_settings().increment_run().await.unwrap(), 2);

        let current = db.thumbnail_settings().current().await.unwrap();
        assert_eq!(current.command_run, 2);
        assert_eq!(current.batch_size, 4);
        assert!(current.all_course_videos && current.commit);
    }
}

// ============================================================================
// Command
// ============================================================================

mod handle {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_all_course_videos_skips_updated() {
        let db = test_db().await;
        seed_catalog(&db).await;
        db.updated_course_videos().bulk_create(&[video("c1", "v1")], 0).await.unwrap();
        save_settings(&db, all_videos_settings(10, false)).await;

        let dispatcher = Arc::new(RecordingDispatcher::default());
        command(&db, dispatcher.clone()).handle(false).await.unwrap();

        let requests = dispatcher.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].course_videos, vec![video("c1", "v2"), video("c2", "v3")]);
    }

    #[tokio::test]
    async fn test_batch_size_one() {
        let db = test_db().await;
        seed_catalog(&db).await;
        db.updated_course_videos().bulk_create(&[video("c1", "v1")], 0).await.unwrap();
        save_settings(&db, all_videos_settings(1, false)).await;

        let dispatcher = Arc::new(RecordingDispatcher::default());
        let report = command(&db, dispatcher.clone()).handle(false).await.unwrap();

        assert_eq!(report.batch_len, 1);
        assert_eq!(dispatcher.requests()[0].course_videos, vec![video("c1", "v2")]);
    }

    #[tokio::test]
    async fn test_course_ids_ignore_batch_size() {
        let db = test_db().await;
        seed_catalog(&db).await;
        db.updated_course_videos().bulk_create(&[video("c1", "v1")], 0).await.unwrap();
        save_settings(
            &db,
            RunSettings {
                course_ids: "c1  c2".into(),
                batch_size: 1,
                force_update: true,
                ..Default::default()
            },
        )
        .await;

        let dispatcher = Arc::new(RecordingDispatcher::default());
        let report = command(&db, dispatcher.clone()).handle(false).await.unwrap();

        let request = &dispatcher.requests()[0];
        assert_eq!(
            request.course_videos,
            vec![video("c1", "v1"), video("c1", "v2"), video("c2", "v3")]
        );
        assert!(request.force_update);
        assert!(report.force_update);
    }

    #[tokio::test]
    async fn test_dry_run_is_repeatable() {
        let db = test_db().await;
        seed_catalog(&db).await;
        save_settings(&db, all_videos_settings(2, false)).await;

        let dispatcher = Arc::new(RecordingDispatcher::default());
        let cmd = command(&db, dispatcher.clone());
        let first = cmd.handle(true).await.unwrap();
        let second = cmd.handle(true).await.unwrap();

        assert_eq!(first.command_run, -1);
        assert_eq!(second.command_run, -1);
        assert_eq!(first.marked_updated, 0);

        let requests = dispatcher.requests();
        assert_eq!(requests[0].course_videos, requests[1].course_videos);
        assert_eq!(requests[0].command_run, -1);
        assert!(!requests[0].commit);
        assert_eq!(db.updated_course_videos().count().await.unwrap(), 0);
        assert_eq!(db.thumbnail_settings().current().await.unwrap().command_run, 0);
    }

    #[tokio::test]
    async fn test_commit_from_settings_marks_batch() {
        let db = test_db().await;
        seed_catalog(&db).await;
        save_settings(&db, all_videos_settings(2, true)).await;

        let dispatcher = Arc::new(RecordingDispatcher::default());
        let report = command(&db, dispatcher.clone()).handle(true).await.unwrap();

        assert_eq!(report.command_run, 1);
        assert_eq!(report.marked_updated, 2);
        assert_eq!(dispatcher.requests()[0].command_run, 1);
        assert!(dispatcher.requests()[0].commit);

        let marked = db.updated_course_videos().list_by_run(1).await.unwrap();
        let keys: Vec<(String, String)> = marked
            .into_iter()
            .map(|r| (r.course_id, r.edx_video_id))
            .collect();
        assert_eq!(
            keys,
            vec![("c1".to_string(), "v1".to_string()), ("c1".to_string(), "v2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_consecutive_commits_walk_the_catalog() {
        let db = test_db().await;
        seed_catalog(&db).await;
        save_settings(&db, all_videos_settings(2, true)).await;

        let dispatcher = Arc::new(RecordingDispatcher::default());
        let cmd = command(&db, dispatcher.clone());
        cmd.handle(true).await.unwrap();
        let second = cmd.handle(true).await.unwrap();
        let third = cmd.handle(true).await.unwrap();

        let requests = dispatcher.requests();
        assert_eq!(requests[1].course_videos, vec![video("c2", "v3")]);
        assert!(requests[2].course_videos.is_empty());
        assert_eq!(second.command_run, 2);
        assert_eq!(third.command_run, 3);
        assert_eq!(third.marked_updated, 0);
    }

    #[tokio::test]
    async fn test_commit_without_from_settings_does_not_mark() {
        let db = test_db().await;
        seed_catalog(&db).await;
        save_settings(&db, all_videos_settings(10, true)).await;

        let dispatcher = Arc::new(RecordingDispatcher::default());
        let report = command(&db, dispatcher).handle(false).await.unwrap();

        assert_eq!(report.command_run, 1);
        assert_eq!(report.marked_updated, 0);
        assert_eq!(db.updated_course_videos().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_commit_without_all_videos_does_not_mark() {
        let db = test_db().await;
        seed_catalog(&db).await;
        save_settings(
            &db,
            RunSettings {
                all_videos: false,
                ..all_videos_settings(10, true)
            },
        )
        .await;

        let dispatcher = Arc::new(RecordingDispatcher::default());
        let report = command(&db, dispatcher).handle(true).await.unwrap();

        assert_eq!(report.command_run, 1);
        assert_eq!(db.updated_course_videos().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_videos_per_task_passed_through() {
        let db = test_db().await;
        seed_catalog(&db).await;
        save_settings(
            &db,
            RunSettings {
                videos_per_task: 2,
                ..all_videos_settings(10, false)
            },
        )
        .await;

        let dispatcher = Arc::new(RecordingDispatcher::default());
        command(&db, dispatcher.clone()).handle(false).await.unwrap();

        assert_eq!(dispatcher.requests()[0].videos_per_task, 2);
    }

    #[tokio::test]
    async fn test_course_ids_commit_marks_every_video() {
        let db = test_db().await;
        seed_catalog(&db).await;
        save_settings(
            &db,
            RunSettings {
                course_ids: "c1 c2".into(),
                commit: true,
                all_videos: true,
                ..Default::default()
            },
        )
        .await;

        let dispatcher = Arc::new(RecordingDispatcher::default());
        let report = command(&db, dispatcher).handle(true).await.unwrap();

        assert_eq!(report.command_run, 1);
        assert_eq!(report.marked_updated, 3);
        let marked: Vec<(String, String, i64)> = db
            .updated_course_videos()
            .list_by_run(1)
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.course_id, r.edx_video_id, r.command_run))
            .collect();
        assert_eq!(
            marked,
            vec![
                ("c1".to_string(), "v1".to_string(), 1),
                ("c1".to_string(), "v2".to_string(), 1),
                ("c2".to_string(), "v3".to_string(), 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_marking_failure_keeps_dispatch_and_run() {
        let db = test_db().await;
        seed_catalog(&db).await;
        db.updated_course_videos().bulk_create(&[video("c1", "v2")], 0).await.unwrap();
        save_settings(
            &db,
            RunSettings {
                course_ids: "c1".into(),
                commit: true,
                all_videos: true,
                ..Default::default()
            },
        )
        .await;

        let dispatcher = Arc::new(RecordingDispatcher::default());
        let result = command(&db, dispatcher.clone()).handle(true).await;

        assert!(result.is_err());
        assert_eq!(db.thumbnail_settings().current().await.unwrap().command_run, 1);
        let requests = dispatcher.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].course_videos, vec![video("c1", "v1"), video("c1", "v2")]);
        assert_eq!(requests[0].command_run, 1);
        assert_eq!(db.updated_course_videos().count().await.unwrap(), 1);
    }
}

// ============================================================================
// End to end through the job table
// ============================================================================

mod end_to_end {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_committed_run_queues_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("thumbs.db").display());
        let db = Database::connect(&url, 2).await.unwrap();
        db.prepare().await.unwrap();
        seed_catalog(&db).await;
        save_settings(
            &db,
            RunSettings {
                videos_per_task: 2,
                ..all_videos_settings(10, true)
            },
        )
        .await;

        let dispatcher = Arc::new(QueueDispatcher::with_job_store(
            db.background_jobs(),
            JobQueueConfig::default(),
            1,
        ));
        let report = command(&db, dispatcher.clone()).handle(true).await.unwrap();
        let ids = report.dispatch.wait().await.unwrap();
        dispatcher.shutdown().await;

        assert_eq!(ids.len(), 2);
        let rows = db
            .background_jobs()
            .list_by_type(UpdateThumbnailsJob::JOB_NAME)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        let mut queued: Vec<CourseVideoId> = rows
            .into_iter()
            .flat_map(|row| {
                let job: UpdateThumbnailsJob = serde_json::from_value(row.data).unwrap();
                assert_eq!(job.command_run, 1);
                job.course_videos
            })
            .collect();
        queued.sort_by(|a, b| a.edx_video_id.cmp(&b.edx_video_id));
        assert_eq!(queued, vec![video("c1", "v1"), video("c1", "v2"), video("c2", "v3")]);
        assert_eq!(db.updated_course_videos().count().await.unwrap(), 3);
    }

    /// A failed run followed by the runtime going away, as when the binary
    /// exits with the error: every dispatched job must already be stored.
    #[test]
    fn test_failed_run_still_stores_dispatched_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("thumbs.db").display());

        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
        let result = runtime.block_on(async {
            let db = Database::connect(&url, 2).await.unwrap();
            db.prepare().await.unwrap();
            seed_catalog(&db).await;
            db.updated_course_videos().bulk_create(&[video("c2", "v3")], 0).await.unwrap();
            save_settings(
                &db,
                RunSettings {
                    course_ids: "c1 c2".into(),
                    videos_per_task: 1,
                    commit: true,
                    all_videos: true,
                    ..Default::default()
                },
            )
            .await;

            let config = JobQueueConfig {
                max_concurrent: 1,
                queue_capacity: 1,
                ..Default::default()
            };
            let dispatcher = Arc::new(QueueDispatcher::with_job_store(db.background_jobs(), config, 0));
            let result = command(&db, dispatcher.clone()).handle(true).await.map(|_| ());
            dispatcher.shutdown().await;
            db.close().await;
            result
        });
        drop(runtime);
        assert!(result.is_err());

        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let db = Database::connect(&url, 1).await.unwrap();
            let rows = db
                .background_jobs()
                .list_by_type(UpdateThumbnailsJob::JOB_NAME)
                .await
                .unwrap();
            assert_eq!(rows.len(), 3);
            assert_eq!(db.thumbnail_settings().current().await.unwrap().command_run, 1);
        });
    }
}
