//! Poll loop behaviour against faked services.

use reposter_worker::poll::FailureStreak;
use reposter_worker::{ItemOutcome, SlideshowPolicy, WorkerError};

use crate::fakes::*;

fn videos(ids: std::ops::RangeInclusive<u64>) -> Vec<reposter_models::SourceVideo> {
    ids.map(video).collect()
}

#[tokio::test]
async fn test_new_uploads_processed_oldest_first() {
    let h = HarnessBuilder::new(videos(1..=5), 2).build();

    let report = h.poller.tick().await.unwrap();

    assert_eq!(report.live_count, 5);
    assert_eq!(report.cursor_before.value(), 2);
    assert_eq!(report.cursor_after.value(), 5);
    assert_eq!(h.retrieved_ids(), vec!["3", "4", "5"]);
    assert_eq!(*h.feed.listing_requests.lock().unwrap(), vec![3]);
    assert_eq!(*h.cursor.saves.lock().unwrap(), vec![3, 4, 5]);
    assert!(report
        .outcomes
        .iter()
        .all(|(_, outcome)| matches!(outcome, ItemOutcome::Published { .. })));
}

#[tokio::test]
async fn test_retrieves_the_target_users_video_url() {
    let h = HarnessBuilder::new(videos(1..=1), 0).build();
    h.poller.tick().await.unwrap();

    let urls = h.retriever.urls.lock().unwrap().clone();
    assert_eq!(urls, vec!["https://www.tiktok.com/@creator/video/1"]);
    assert_eq!(h.transcoder.sources.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_deleted_uploads_clamp_cursor() {
    let h = HarnessBuilder::new(videos(1..=5), 7).build();

    let report = h.poller.tick().await.unwrap();

    assert_eq!(report.cursor_after.value(), 5);
    assert_eq!(*h.cursor.saves.lock().unwrap(), vec![5]);
    assert!(h.retrieved_ids().is_empty());
    assert!(h.feed.listing_requests.lock().unwrap().is_empty());
    assert!(h.notifier.contents().is_empty());
}

#[tokio::test]
async fn test_up_to_date_does_nothing() {
    let h = HarnessBuilder::new(videos(1..=4), 4).build();

    let report = h.poller.tick().await.unwrap();

    assert!(report.outcomes.is_empty());
    assert_eq!(report.cursor_after.value(), 4);
    assert!(h.cursor.saves.lock().unwrap().is_empty());
    assert!(h.retrieved_ids().is_empty());
}

#[tokio::test]
async fn test_second_tick_after_catching_up_is_idle() {
    let h = HarnessBuilder::new(videos(1..=3), 1).build();

    h.poller.tick().await.unwrap();
    let report = h.poller.tick().await.unwrap();

    assert!(report.outcomes.is_empty());
    assert_eq!(h.retrieved_ids(), vec!["2", "3"]);
}

#[tokio::test]
async fn test_cursor_persisted_after_each_item() {
    let mut builder = HarnessBuilder::new(videos(1..=6), 2);
    builder.cursor.fail_on_save = Some(3);
    let h = builder.build();

    let err = h.poller.tick().await.unwrap_err();

    assert!(matches!(err, WorkerError::Store(_)));
    assert_eq!(*h.cursor.saves.lock().unwrap(), vec![3, 4]);
    assert_eq!(h.cursor.current(), 4);
    assert_eq!(h.retrieved_ids(), vec!["3", "4", "5"]);
}

#[tokio::test]
async fn test_slideshow_skipped_without_pipeline_calls() {
    let h = HarnessBuilder::new(vec![video(1), slideshow(2), video(3)], 1).build();

    let report = h.poller.tick().await.unwrap();

    assert_eq!(h.retrieved_ids(), vec!["3"]);
    assert_eq!(h.platform.jobs.lock().unwrap().len(), 1);
    assert_eq!(*h.cursor.saves.lock().unwrap(), vec![2, 3]);
    assert_eq!(report.outcomes[0].1, ItemOutcome::SkippedSlideshow);
}

#[tokio::test]
async fn test_slideshow_attempted_under_attempt_policy() {
    let mut builder = HarnessBuilder::new(vec![video(1), slideshow(2)], 1);
    builder.policy = SlideshowPolicy::Attempt;
    let h = builder.build();

    h.poller.tick().await.unwrap();

    assert_eq!(h.retrieved_ids(), vec!["2"]);
}

#[tokio::test]
async fn test_published_video_is_announced_with_attachment() {
    let h = HarnessBuilder::new(videos(1..=1), 0).build();

    h.poller.tick().await.unwrap();

    let jobs = h.platform.jobs.lock().unwrap().clone();
    assert_eq!(jobs.len(), 1);
    let (credential, job) = &jobs[0];
    assert_eq!(credential, "session-abc");
    assert_eq!(job.title, "video 1");
    assert_eq!(job.tags, vec!["fyp", "dance"]);
    assert_eq!(job.mentions, vec![TARGET]);

    let sent = h.notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].content, "@creator video 1 #fyp #dance");
    let attachment = sent[0].attachment.as_ref().unwrap();
    assert_eq!(attachment.filename, "tiktok.mp4");
}

#[tokio::test]
async fn test_expired_credential_notifies_operator() {
    let mut builder = HarnessBuilder::new(videos(1..=2), 1);
    builder.mode = PublishMode::ExpireCredential;
    let h = builder.build();

    let report = h.poller.tick().await.unwrap();

    assert_eq!(
        report.outcomes[0].1,
        ItemOutcome::PublishFailed {
            credential_expired: true
        }
    );
    assert_eq!(
        h.notifier.contents(),
        vec![
            "<@42> Tried to upload, but session ID not valid! Need to update!".to_string(),
            "@creator video 2 #fyp #dance".to_string(),
        ]
    );
    assert_eq!(h.cursor.current(), 2);
}

#[tokio::test]
async fn test_rejected_publish_reports_busy_server() {
    let mut builder = HarnessBuilder::new(videos(1..=1), 0);
    builder.mode = PublishMode::Reject;
    let h = builder.build();

    let report = h.poller.tick().await.unwrap();

    assert_eq!(
        report.outcomes[0].1,
        ItemOutcome::PublishFailed {
            credential_expired: false
        }
    );
    assert_eq!(
        h.notifier.contents()[0],
        "<@42> Tried to upload, but server is busy."
    );
}

#[tokio::test]
async fn test_retrieval_failure_is_isolated() {
    let mut builder = HarnessBuilder::new(videos(1..=3), 0);
    builder.retriever.fail_id = Some("2".to_string());
    let h = builder.build();

    let report = h.poller.tick().await.unwrap();

    assert!(matches!(report.outcomes[1].1, ItemOutcome::Failed { .. }));
    assert_eq!(h.platform.jobs.lock().unwrap().len(), 2);
    assert_eq!(*h.cursor.saves.lock().unwrap(), vec![1, 2, 3]);
    assert!(h
        .notifier
        .contents()
        .iter()
        .any(|c| c.starts_with("<@42> Failed to process video 2:")));
}

#[tokio::test]
async fn test_panicking_item_does_not_stop_the_tick() {
    let mut builder = HarnessBuilder::new(videos(1..=2), 0);
    builder.transcoder.panic_id = Some("1".to_string());
    let h = builder.build();

    let report = h.poller.tick().await.unwrap();

    assert!(matches!(report.outcomes[0].1, ItemOutcome::Failed { .. }));
    assert!(matches!(report.outcomes[1].1, ItemOutcome::Published { .. }));
    assert_eq!(h.cursor.current(), 2);
}

#[tokio::test]
async fn test_work_directories_removed_after_each_item() {
    let mut builder = HarnessBuilder::new(videos(1..=2), 0);
    builder.retriever.fail_id = Some("2".to_string());
    let h = builder.build();

    h.poller.tick().await.unwrap();

    assert!(!h.work_root.join("1").exists());
    assert!(!h.work_root.join("2").exists());
}

#[tokio::test]
async fn test_new_uploads_seen_on_later_tick() {
    let h = HarnessBuilder::new(videos(1..=3), 2).build();
    *h.feed.count.lock().unwrap() = 2;

    let report = h.poller.tick().await.unwrap();
    assert!(report.outcomes.is_empty());

    *h.feed.count.lock().unwrap() = 3;
    let report = h.poller.tick().await.unwrap();
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(h.retrieved_ids(), vec!["3"]);
}

#[tokio::test]
async fn test_unlisted_uploads_skipped_and_reported() {
    let h = HarnessBuilder::new(videos(1..=3), 0).build();
    *h.feed.count.lock().unwrap() = 5;

    let report = h.poller.tick().await.unwrap();

    assert_eq!(report.unlisted, 2);
    assert_eq!(report.cursor_after.value(), 5);
    assert_eq!(*h.cursor.saves.lock().unwrap(), vec![2, 3, 4, 5]);
    assert_eq!(h.retrieved_ids(), vec!["1", "2", "3"]);
    assert_eq!(
        h.notifier.contents()[0],
        "<@42> @creator has 2 new video(s) that are not publicly listed, skipping them."
    );

    let report = h.poller.tick().await.unwrap();
    assert!(report.outcomes.is_empty());
    assert_eq!(report.unlisted, 0);
}

#[tokio::test]
async fn test_repeated_transient_tick_failures_notify_once() {
    let h = HarnessBuilder::new(videos(1..=2), 1).build();
    *h.feed.fail_status.lock().unwrap() = Some(503);
    let mut streak = FailureStreak::default();

    assert!(h.poller.poll_once(&mut streak).await.is_none());
    assert!(h.poller.poll_once(&mut streak).await.is_none());
    assert!(h.notifier.contents().is_empty());

    assert!(h.poller.poll_once(&mut streak).await.is_none());
    assert!(h.poller.poll_once(&mut streak).await.is_none());
    let sent = h.notifier.contents();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with("<@42> Checking for new videos failed 3 time(s) in a row"));

    *h.feed.fail_status.lock().unwrap() = None;
    let report = h.poller.poll_once(&mut streak).await.unwrap();
    assert_eq!(report.cursor_after.value(), 2);
    assert_eq!(streak.consecutive(), 0);
}

#[tokio::test]
async fn test_fatal_tick_failure_notifies_immediately() {
    let h = HarnessBuilder::new(videos(1..=2), 1).build();
    *h.feed.fail_status.lock().unwrap() = Some(404);
    let mut streak = FailureStreak::default();

    assert!(h.poller.poll_once(&mut streak).await.is_none());

    let sent = h.notifier.contents();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with("<@42> Checking for new videos failed 1 time(s) in a row"));
    assert!(h.retrieved_ids().is_empty());
}
