//! Structured per-video logging.

use tracing::{error, info, warn, Span};

use reposter_models::VideoId;

/// Logs one source video's trip through the pipeline with consistent fields.
#[derive(Debug, Clone)]
pub struct VideoLogger {
    video_id: String,
    operation: String,
}

impl VideoLogger {
    pub fn new(video_id: &VideoId, operation: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Video started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Video progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Video warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Video error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Video completed: {}", message
        );
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span to instrument the item's task with.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "video",
            video_id = %self.video_id,
            operation = %self.operation
        )
    }
}
