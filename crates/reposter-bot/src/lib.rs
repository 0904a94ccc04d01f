//! Operator bot for the reposter.
//!
//! Two guild-scoped slash commands:
//! - `update session_id:<value>` replaces and persists the session credential
//! - `current` replies with the credential in use

pub mod commands;
pub mod error;
pub mod gateway;

pub use commands::{CommandRouter, OperatorCommand};
pub use error::{BotError, BotResult};
pub use gateway::{command_definitions, parse_guild_id, run_bot};
