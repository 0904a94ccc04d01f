//! Operator command parsing and execution, independent of the gateway.

use tracing::info;

use reposter_models::SessionCredential;
use reposter_store::CredentialHandle;

use crate::error::{BotError, BotResult};

pub const UPDATE: &str = "update";
pub const CURRENT: &str = "current";
pub const SESSION_ID_OPTION: &str = "session_id";

/// A parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Update { session_id: String },
    Current,
}

impl OperatorCommand {
    /// Parse a command name and its string options.
    pub fn parse(name: &str, options: &[(&str, &str)]) -> BotResult<Self> {
        match name {
            UPDATE => {
                let session_id = options
                    .iter()
                    .find(|(key, _)| *key == SESSION_ID_OPTION)
                    .map(|(_, value)| value.trim())
                    .filter(|value| !value.is_empty())
                    .ok_or(BotError::MissingOption(SESSION_ID_OPTION))?;
                Ok(Self::Update {
                    session_id: session_id.to_string(),
                })
            }
            CURRENT => Ok(Self::Current),
            other => Err(BotError::UnknownCommand(other.to_string())),
        }
    }
}

/// Runs operator commands against the credential owner.
#[derive(Clone)]
pub struct CommandRouter {
    credentials: CredentialHandle,
}

impl CommandRouter {
    pub fn new(credentials: CredentialHandle) -> Self {
        Self { credentials }
    }

    /// Execute a command and return the reply text.
    pub async fn execute(&self, command: OperatorCommand) -> BotResult<String> {
        match command {
            OperatorCommand::Update { session_id } => {
                let credential = SessionCredential::new(session_id);
                self.credentials.set(credential.clone()).await?;
                info!(session_id = %credential.masked(), "Session credential replaced");
                Ok(format!("Updated session_id to `{}`", credential.expose()))
            }
            OperatorCommand::Current => {
                let credential = self.credentials.get().await?;
                Ok(format!("Current session_id is : `{}`", credential.expose()))
            }
        }
    }
}
