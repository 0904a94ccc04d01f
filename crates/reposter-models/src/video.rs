//! Source video descriptors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform identifier of a source video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A video on the watched account, as seen by one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceVideo {
    pub id: VideoId,

    /// Caption text including hashtags
    #[serde(default)]
    pub caption: String,

    pub created_at: DateTime<Utc>,

    /// Multi-image post; downloaders cannot fetch these as a video
    #[serde(default)]
    pub is_slideshow: bool,
}

impl SourceVideo {
    /// Public web URL of this video under `author`.
    pub fn web_url(&self, author: &str) -> String {
        format!("https://www.tiktok.com/@{}/video/{}", author, self.id)
    }

    /// First few characters of the caption, for log lines.
    pub fn caption_preview(&self) -> String {
        let preview: String = self.caption.chars().take(20).collect();
        preview.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn video(caption: &str) -> SourceVideo {
        SourceVideo {
            id: VideoId::from("7301234567890123456"),
            caption: caption.to_string(),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            is_slideshow: false,
        }
    }

    #[test]
    fn test_web_url() {
        assert_eq!(
            video("").web_url("someone"),
            "https://www.tiktok.com/@someone/video/7301234567890123456"
        );
    }

    #[test]
    fn test_caption_preview_is_char_safe() {
        let v = video("  héllo wörld, this caption is long #tag");
        assert_eq!(v.caption_preview(), "héllo wörld, this");
    }
}
