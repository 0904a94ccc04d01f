//! Notification payloads and the operator-facing message texts.

use std::path::PathBuf;

/// Longest message content the chat channel accepts, in characters.
pub const CONTENT_LIMIT: usize = 2000;

/// File sent along with a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub path: PathBuf,
    /// Name shown in the channel
    pub filename: String,
}

/// One message to post to the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub content: String,
    pub attachment: Option<Attachment>,
}

impl Notification {
    /// Plain message, cut to [`CONTENT_LIMIT`] characters.
    pub fn text(content: impl Into<String>) -> Self {
        let mut content = content.into();
        if let Some((end, _)) = content.char_indices().nth(CONTENT_LIMIT) {
            content.truncate(end);
        }
        Self {
            content,
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, path: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        self.attachment = Some(Attachment {
            path: path.into(),
            filename: filename.into(),
        });
        self
    }

    /// Publish failed because the session credential is no longer valid.
    pub fn credential_expired(operator_id: &str) -> Self {
        Self::text(format!(
            "<@{}> Tried to upload, but session ID not valid! Need to update!",
            operator_id
        ))
    }

    /// Publish failed for any other reason.
    pub fn server_busy(operator_id: &str) -> Self {
        Self::text(format!(
            "<@{}> Tried to upload, but server is busy.",
            operator_id
        ))
    }

    /// The composed video, announced whether or not publishing worked.
    pub fn repost(target_user: &str, caption: &str, media: impl Into<PathBuf>) -> Self {
        Self::text(format!("@{} {}", target_user, caption)).with_attachment(media, "tiktok.mp4")
    }

    /// Periodic nudge to refresh the credential.
    pub fn reminder(operator_id: &str) -> Self {
        Self::text(format!(
            "<@{}> Reminder to update session ID soon! It's been one month!",
            operator_id
        ))
    }

    /// The pipeline failed before anything could be published.
    pub fn processing_failed(operator_id: &str, video_id: &str, error: &str) -> Self {
        Self::text(format!(
            "<@{}> Failed to process video {}: {}",
            operator_id, video_id, error
        ))
    }

    /// Uploads the account counts but does not list were stepped over.
    pub fn unlisted_skipped(operator_id: &str, target_user: &str, count: u64) -> Self {
        Self::text(format!(
            "<@{}> @{} has {} new video(s) that are not publicly listed, skipping them.",
            operator_id, target_user, count
        ))
    }

    /// Poll ticks keep failing.
    pub fn polling_failed(operator_id: &str, failed_ticks: u32, error: &str) -> Self {
        Self::text(format!(
            "<@{}> Checking for new videos failed {} time(s) in a row: {}",
            operator_id, failed_ticks, error
        ))
    }
}
