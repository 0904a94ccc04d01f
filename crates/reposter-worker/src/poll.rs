//! The poll loop: compare the upload cursor with the live count and work
//! through whatever is new, oldest first.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn, Instrument};

use reposter_media::fs_utils::remove_work_dir;
use reposter_models::{CursorPlan, SourceVideo, UploadCursor, VideoId};
use reposter_notify::Notification;
use reposter_platform::SourceFeed;
use reposter_store::CursorStore;

use crate::config::SlideshowPolicy;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::VideoLogger;
use crate::metrics;
use crate::pipeline::{ItemOutcome, Pipeline};

/// Settings the poll loop needs beyond its services.
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub target_user: String,
    pub work_dir: PathBuf,
    pub slideshow_policy: SlideshowPolicy,
    pub poll_interval: Duration,
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub live_count: u64,
    pub cursor_before: UploadCursor,
    pub cursor_after: UploadCursor,
    /// Processed videos in processing order
    pub outcomes: Vec<(VideoId, ItemOutcome)>,
    /// New uploads counted by the account but missing from its listing
    pub unlisted: u64,
}

/// Retryable tick failures tolerated before the operator hears about them.
const RETRYABLE_FAILURES_BEFORE_NOTICE: u32 = 3;

/// Consecutive failed ticks, and whether the operator was told.
#[derive(Debug, Default)]
pub struct FailureStreak {
    consecutive: u32,
    notified: bool,
}

impl FailureStreak {
    /// Count a failed tick. Returns true when the operator should be told.
    ///
    /// Non-retryable errors are reported at once, retryable ones once they
    /// repeat. A streak is reported only once.
    pub fn record_failure(&mut self, error: &WorkerError) -> bool {
        self.consecutive += 1;
        if self.notified {
            return false;
        }
        let notify =
            !error.is_retryable() || self.consecutive >= RETRYABLE_FAILURES_BEFORE_NOTICE;
        self.notified = notify;
        notify
    }

    /// A tick succeeded. Returns the length of the streak it ended.
    pub fn record_success(&mut self) -> u32 {
        std::mem::take(self).consecutive
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

pub struct Poller {
    feed: Arc<dyn SourceFeed>,
    cursor_store: Arc<dyn CursorStore>,
    pipeline: Arc<Pipeline>,
    settings: PollSettings,
}

impl Poller {
    pub fn new(
        feed: Arc<dyn SourceFeed>,
        cursor_store: Arc<dyn CursorStore>,
        pipeline: Arc<Pipeline>,
        settings: PollSettings,
    ) -> Self {
        Self {
            feed,
            cursor_store,
            pipeline,
            settings,
        }
    }

    /// Tick now, then every poll interval. Ticks never overlap.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.settings.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut streak = FailureStreak::default();

        loop {
            interval.tick().await;
            self.poll_once(&mut streak).await;
        }
    }

    /// Run one tick and report a failing streak to the operator.
    pub async fn poll_once(&self, streak: &mut FailureStreak) -> Option<TickReport> {
        match self.tick().await {
            Ok(report) => {
                let recovered = streak.record_success();
                info!(
                    live_count = report.live_count,
                    cursor = %report.cursor_after,
                    processed = report.outcomes.len(),
                    "Poll tick finished"
                );
                if recovered > 0 {
                    info!(failed_ticks = recovered, "Polling recovered");
                }
                Some(report)
            }
            Err(e) => {
                error!(error = %e, retryable = e.is_retryable(), "Poll tick failed");
                metrics::record_tick("failed");
                if streak.record_failure(&e) {
                    self.pipeline
                        .announce(Notification::polling_failed(
                            &self.pipeline.operator_id,
                            streak.consecutive(),
                            &e.to_string(),
                        ))
                        .await;
                }
                None
            }
        }
    }

    /// One pass of the cursor state machine.
    pub async fn tick(&self) -> WorkerResult<TickReport> {
        let user = &self.settings.target_user;
        let cursor = self.cursor_store.load().await?;
        let live_count = self.feed.video_count(user).await?;
        info!(user = %user, cursor = %cursor, live_count, "Checking for new videos");

        let mut report = TickReport {
            live_count,
            cursor_before: cursor,
            cursor_after: cursor,
            outcomes: Vec::new(),
            unlisted: 0,
        };

        let plan = cursor.plan(live_count);
        match plan {
            CursorPlan::UpToDate => {
                info!("No new video");
                metrics::record_tick("up_to_date");
            }
            CursorPlan::Deleted { clamp_to } => {
                self.cursor_store.save(clamp_to).await?;
                report.cursor_after = clamp_to;
                info!(from = %cursor, to = %clamp_to, "Videos were deleted, clamped cursor");
                metrics::record_tick("deleted");
            }
            CursorPlan::Process { pending } => {
                let videos = self.feed.recent_videos(user, pending as usize).await?;
                let mut current = cursor;

                // The listing is newest first, so uploads it leaves out are
                // taken to be the oldest unseen ones. Step over them.
                let unlisted = pending.saturating_sub(videos.len() as u64);
                if unlisted > 0 {
                    current = UploadCursor::new(current.value() + unlisted);
                    self.cursor_store.save(current).await?;
                    report.cursor_after = current;
                    report.unlisted = unlisted;
                    warn!(
                        unlisted,
                        listed = videos.len(),
                        "Account lists fewer videos than it counts"
                    );
                    metrics::record_unlisted(unlisted);
                    self.pipeline
                        .announce(Notification::unlisted_skipped(
                            &self.pipeline.operator_id,
                            user,
                            unlisted,
                        ))
                        .await;
                }

                for index in plan.listing_indices().filter(|&i| i < videos.len()) {
                    let video = videos[index].clone();

                    let id = video.id.clone();
                    let outcome = self.process_item(video).await;
                    metrics::record_video(outcome.as_str());

                    current = current.advanced();
                    self.cursor_store.save(current).await?;
                    report.cursor_after = current;
                    report.outcomes.push((id, outcome));
                }
                metrics::record_tick("process");
            }
        }

        Ok(report)
    }

    async fn process_item(&self, video: SourceVideo) -> ItemOutcome {
        let logger = VideoLogger::new(&video.id, "repost");

        if video.is_slideshow && self.settings.slideshow_policy == SlideshowPolicy::Skip {
            logger.log_warning("slideshow, not creating another video");
            metrics::record_slideshow_skipped();
            return ItemOutcome::SkippedSlideshow;
        }

        let work_dir = self.settings.work_dir.join(dir_name(&video.id));
        let pipeline = Arc::clone(&self.pipeline);
        let task_video = video.clone();
        let task_dir = work_dir.clone();

        let joined = tokio::spawn(
            async move { pipeline.run(&task_video, &task_dir).await }
                .instrument(logger.create_span()),
        )
        .await;

        let outcome = match joined {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => self.item_failed(&logger, &video, e.to_string()).await,
            Err(e) => {
                self.item_failed(&logger, &video, format!("task aborted: {}", e))
                    .await
            }
        };

        if let Err(e) = remove_work_dir(&work_dir).await {
            logger.log_warning(&format!("cleanup of {} failed: {}", work_dir.display(), e));
        }

        outcome
    }

    async fn item_failed(&self, logger: &VideoLogger, video: &SourceVideo, error: String) -> ItemOutcome {
        logger.log_error(&error);
        self.pipeline
            .announce(Notification::processing_failed(
                &self.pipeline.operator_id,
                video.id.as_str(),
                &error,
            ))
            .await;
        ItemOutcome::Failed { error }
    }
}

/// Work directory name for a video id.
fn dir_name(id: &VideoId) -> String {
    let name: String = id
        .as_str()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if name.is_empty() {
        "item".to_string()
    } else {
        name
    }
}
