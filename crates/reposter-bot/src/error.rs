//! Bot error types.

use thiserror::Error;

use reposter_store::StoreError;

pub type BotResult<T> = Result<T, BotError>;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing option: {0}")]
    MissingOption(&'static str),

    #[error("Invalid guild id: {0}")]
    InvalidGuild(String),

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("Discord error: {0}")]
    Discord(#[from] serenity::Error),
}
