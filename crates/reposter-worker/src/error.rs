//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Item task failed: {0}")]
    TaskFailed(String),

    #[error("Media error: {0}")]
    Media(#[from] reposter_media::MediaError),

    #[error("Platform error: {0}")]
    Platform(#[from] reposter_platform::PlatformError),

    #[error("Store error: {0}")]
    Store(#[from] reposter_store::StoreError),

    #[error("Notify error: {0}")]
    Notify(#[from] reposter_notify::NotifyError),

    #[error("Bot error: {0}")]
    Bot(#[from] reposter_bot::BotError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn task_failed(msg: impl Into<String>) -> Self {
        Self::TaskFailed(msg.into())
    }

    /// Publishing failed because the session credential is no longer accepted.
    pub fn is_credential_expired(&self) -> bool {
        matches!(self, WorkerError::Platform(e) if e.is_credential_expired())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Platform(e) => e.is_retryable(),
            WorkerError::Notify(e) => e.is_retryable(),
            WorkerError::Media(e) => matches!(
                e,
                reposter_media::MediaError::DownloadFailed { .. }
                    | reposter_media::MediaError::Browser(_)
                    | reposter_media::MediaError::Timeout(_)
            ),
            _ => false,
        }
    }
}
