//! Platform error types.

use std::fmt;

use thiserror::Error;

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// The step of the publish sequence a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    UploadPage,
    ProjectCreate,
    AccountInfo,
    UploadAuth,
    ApplyUpload,
    ChunkTransfer,
    FinishUpload,
    CommitUpload,
    TagLookup,
    Publish,
    UserDetail,
    ItemList,
}

impl PublishStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UploadPage => "upload_page",
            Self::ProjectCreate => "project_create",
            Self::AccountInfo => "account_info",
            Self::UploadAuth => "upload_auth",
            Self::ApplyUpload => "apply_upload",
            Self::ChunkTransfer => "chunk_transfer",
            Self::FinishUpload => "finish_upload",
            Self::CommitUpload => "commit_upload",
            Self::TagLookup => "tag_lookup",
            Self::Publish => "publish",
            Self::UserDetail => "user_detail",
            Self::ItemList => "item_list",
        }
    }
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while talking to the platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Session credential expired or invalid")]
    CredentialExpired,

    #[error("HTTP {status} at {step}: {body}")]
    Network {
        step: PublishStep,
        status: u16,
        body: String,
    },

    #[error("Unexpected response at {step}: {message}")]
    InvalidResponse { step: PublishStep, message: String },

    #[error("Publish rejected with status_code {status_code}: {body}")]
    PublishRejected { status_code: i64, body: String },

    #[error(transparent)]
    ScheduleTooFar(#[from] reposter_models::ScheduleError),

    #[error("Media file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl PlatformError {
    pub fn network(step: PublishStep, status: u16, body: impl Into<String>) -> Self {
        Self::Network {
            step,
            status,
            body: body.into(),
        }
    }

    pub fn invalid_response(step: PublishStep, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            step,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn is_credential_expired(&self) -> bool {
        matches!(self, Self::CredentialExpired)
    }

    /// Check if the request may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Network { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
