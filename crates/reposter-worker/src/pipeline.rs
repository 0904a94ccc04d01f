//! One source video through retrieve, compose, publish and announce.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use reposter_media::{Retriever, Transcoder};
use reposter_models::{PublishJob, SourceVideo};
use reposter_notify::{Notification, Notifier};
use reposter_platform::PlatformClient;
use reposter_store::CredentialHandle;

use crate::error::WorkerResult;
use crate::logging::VideoLogger;
use crate::metrics;

/// File name the retrieved source is saved under.
pub const SOURCE_FILE: &str = "tiktok.mp4";

/// How one video left the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Published; carries the platform's video id.
    Published { video_id: String },
    /// Composed and announced, but the platform refused it.
    PublishFailed { credential_expired: bool },
    /// Multi-image post left alone.
    SkippedSlideshow,
    /// Retrieval or composition failed, or the task died.
    Failed { error: String },
}

impl ItemOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemOutcome::Published { .. } => "published",
            ItemOutcome::PublishFailed { .. } => "publish_failed",
            ItemOutcome::SkippedSlideshow => "skipped_slideshow",
            ItemOutcome::Failed { .. } => "failed",
        }
    }
}

/// The external services one pipeline pass uses.
pub struct Pipeline {
    pub retriever: Arc<dyn Retriever>,
    pub transcoder: Arc<dyn Transcoder>,
    pub platform: Arc<dyn PlatformClient>,
    pub notifier: Arc<dyn Notifier>,
    pub credentials: CredentialHandle,
    /// Watched account, also the mention target
    pub target_user: String,
    pub operator_id: String,
}

impl Pipeline {
    /// Run `video` through the pipeline inside `work_dir`.
    ///
    /// Errors are returned only for failures before the composed file
    /// exists. Publish failures are reported to the operator and folded into
    /// the outcome.
    pub async fn run(&self, video: &SourceVideo, work_dir: &Path) -> WorkerResult<ItemOutcome> {
        let logger = VideoLogger::new(&video.id, "repost");
        tokio::fs::create_dir_all(work_dir).await?;

        logger.log_start(&format!("{}...", video.caption_preview()));
        let url = video.web_url(&self.target_user);
        let source = self
            .retriever
            .retrieve(&url, &work_dir.join(SOURCE_FILE))
            .await?;
        logger.log_progress("downloaded source");

        let output = self.transcoder.compose(&source, work_dir).await?;
        logger.log_progress("composed overlay");

        let job = PublishJob::from_caption(&video.caption, &output, &self.target_user);
        let credential = self.credentials.get().await?;

        let outcome = match self.platform.publish(&credential, &job).await {
            Ok(receipt) => {
                logger.log_completion(&format!("published as {}", receipt.video_id));
                ItemOutcome::Published {
                    video_id: receipt.video_id,
                }
            }
            Err(e) => {
                let credential_expired = e.is_credential_expired();
                logger.log_error(&format!("publish failed: {}", e));
                if credential_expired {
                    metrics::record_publish_failure("credential_expired");
                    self.announce(Notification::credential_expired(&self.operator_id))
                        .await;
                } else {
                    metrics::record_publish_failure("platform");
                    self.announce(Notification::server_busy(&self.operator_id))
                        .await;
                }
                ItemOutcome::PublishFailed { credential_expired }
            }
        };

        self.announce(Notification::repost(&self.target_user, &job.caption, &output))
            .await;
        Ok(outcome)
    }

    /// Send a notification; failures are logged and otherwise ignored.
    pub async fn announce(&self, notification: Notification) {
        match self.notifier.notify(&notification).await {
            Ok(()) => info!(
                attachment = notification.attachment.is_some(),
                "Sent notification"
            ),
            Err(e) => warn!(error = %e, "Failed to send notification"),
        }
    }
}
