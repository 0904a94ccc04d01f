//! Persisted configuration for the reposter.
//!
//! This crate provides:
//! - A dotenv-format key/value file with atomic, comment-preserving updates
//! - Upload cursor persistence behind the `CursorStore` trait
//! - The task that owns the session credential

pub mod credential;
pub mod cursor;
pub mod env_file;
pub mod error;

pub use credential::{spawn_credential_owner, CredentialHandle};
pub use cursor::CursorStore;
pub use env_file::{keys, EnvStore};
pub use error::{StoreError, StoreResult};
