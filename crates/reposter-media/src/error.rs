//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during retrieval and composition.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("yt-dlp not found in PATH")]
    YtDlpNotFound,

    #[error("Encode failed: {message}")]
    Encode {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Download failed: {message}")]
    DownloadFailed { message: String },

    #[error("Browser automation failed: {0}")]
    Browser(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("No overlay clips found in {0}")]
    NoOverlayClips(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an encode failure error.
    pub fn encode_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::Encode {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    /// Create a browser automation error.
    pub fn browser(message: impl Into<String>) -> Self {
        Self::Browser(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True if the transcoder ran and exited non-zero.
    pub fn is_encode_error(&self) -> bool {
        matches!(self, MediaError::Encode { .. })
    }
}

impl From<thirtyfour::error::WebDriverError> for MediaError {
    fn from(e: thirtyfour::error::WebDriverError) -> Self {
        Self::Browser(e.to_string())
    }
}
