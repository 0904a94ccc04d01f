//! Notifier error types.

use thiserror::Error;

/// Result type for notification delivery.
pub type NotifyResult<T> = Result<T, NotifyError>;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Webhook returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to read attachment: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NotifyError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
