//! Publish jobs derived from a source video's caption.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Platform caption limit, leaving room for the trailing ` @mention`.
pub const CAPTION_LIMIT: usize = 2198;

/// One video's transient unit of work through compose and upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishJob {
    /// Caption after trimming to the platform limit
    pub caption: String,
    /// Composed media file to upload
    pub media_path: PathBuf,
    /// Caption text before the first hashtag
    pub title: String,
    /// Hashtags without the leading `#`
    pub tags: Vec<String>,
    /// Accounts to mention
    pub mentions: Vec<String>,
    /// Requested go-live time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<DateTime<Utc>>,
}

impl PublishJob {
    /// Build a job from a source caption, mentioning `mention`.
    pub fn from_caption(caption: &str, media_path: impl Into<PathBuf>, mention: &str) -> Self {
        let caption = trim_caption(caption, mention);
        let title = derive_title(&caption);
        let tags = extract_tags(&caption);

        Self {
            caption,
            media_path: media_path.into(),
            title,
            tags,
            mentions: vec![mention.to_string()],
            schedule: None,
        }
    }

    pub fn with_schedule(mut self, at: DateTime<Utc>) -> Self {
        self.schedule = Some(at);
        self
    }
}

/// Trim a caption so the caption plus the mention fit the platform limit.
pub fn trim_caption(caption: &str, mention: &str) -> String {
    let limit = CAPTION_LIMIT.saturating_sub(mention.chars().count());
    caption.chars().take(limit).collect()
}

/// Caption text before the first hashtag, or the whole caption.
pub fn derive_title(caption: &str) -> String {
    let title = match caption.find('#') {
        Some(idx) => &caption[..idx],
        None => caption,
    };
    title.trim_end().to_string()
}

/// Every whitespace-separated `#word` in the caption, without the `#`.
pub fn extract_tags(caption: &str) -> Vec<String> {
    caption
        .split_whitespace()
        .filter_map(|word| word.strip_prefix('#'))
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_stops_at_first_tag_without_trailing_space() {
        assert_eq!(derive_title("look at this  #fyp #dance"), "look at this");
        assert_eq!(derive_title("no tags here "), "no tags here");
        assert_eq!(derive_title("#fyp only"), "");
    }

    #[test]
    fn test_from_caption_splits_title_and_tags() {
        let job = PublishJob::from_caption(
            "new drop today #fyp #dance moves",
            "/tmp/out.mp4",
            "creator",
        );
        assert_eq!(job.title, "new drop today");
        assert_eq!(job.tags, vec!["fyp", "dance"]);
        assert_eq!(job.mentions, vec!["creator"]);
        assert_eq!(job.media_path, PathBuf::from("/tmp/out.mp4"));
        assert!(job.schedule.is_none());
    }

    #[test]
    fn test_caption_without_hashtag_keeps_whole_caption() {
        let job = PublishJob::from_caption("just words", "out.mp4", "creator");
        assert_eq!(job.title, "just words");
        assert!(job.tags.is_empty());
    }

    #[test]
    fn test_trim_caption_respects_mention_length() {
        let caption = "a".repeat(3000);
        let trimmed = trim_caption(&caption, "creator");
        assert_eq!(trimmed.chars().count(), CAPTION_LIMIT - 7);

        let short = trim_caption("short", "creator");
        assert_eq!(short, "short");
    }

    #[test]
    fn test_lone_hash_is_not_a_tag() {
        assert_eq!(extract_tags("look # here #ok"), vec!["ok"]);
    }
}
