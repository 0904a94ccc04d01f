//! Session credential for the platform's private web API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque `sessionid` cookie value tied to the publishing account.
///
/// `Debug` is redacted so the token never lands in logs by accident.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCredential(String);

impl SessionCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into().trim().to_string())
    }

    /// The raw token, for building the cookie and for operator replies.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short prefix suitable for log lines.
    pub fn masked(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        format!("{}…", prefix)
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionCredential").field(&self.masked()).finish()
    }
}

impl From<&str> for SessionCredential {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SessionCredential {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
