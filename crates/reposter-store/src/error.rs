//! Store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Config file {path} is not valid dotenv: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Required key {0} is missing")]
    MissingKey(String),

    #[error("Key {key} has invalid value {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid key name {0:?}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to replace config file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Credential owner task has stopped")]
    OwnerStopped,

    #[error("Blocking store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl StoreError {
    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::MissingKey(key.into())
    }

    pub fn invalid_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
        }
    }
}
