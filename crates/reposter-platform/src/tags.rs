//! Hashtag and mention resolution for the publish caption.
//!
//! Each tag and mention is looked up so the caption links to the canonical
//! hashtag or account, then appended to the title and recorded as a
//! `text_extra` span.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PlatformConfig;
use crate::error::{PlatformResult, PublishStep};
use crate::http::send;

/// A linked span inside the caption text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextExtra {
    /// Character offset of the `#`/`@`
    pub start: usize,
    /// Character offset one past the span
    pub end: usize,
    pub user_id: String,
    /// 1 = hashtag, 0 = mention
    #[serde(rename = "type")]
    pub kind: u8,
    pub hashtag_name: String,
}

pub const HASHTAG: u8 = 1;
pub const MENTION: u8 = 0;

/// Caption text and its linked spans, built up one tag at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caption {
    pub text: String,
    pub text_extra: Vec<TextExtra>,
}

impl Caption {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            text: title.into(),
            text_extra: Vec::new(),
        }
    }

    pub fn push_hashtag(&mut self, name: &str) {
        self.push_span('#', name, String::new(), HASHTAG);
    }

    pub fn push_mention(&mut self, name: &str, user_id: &str) {
        self.push_span('@', name, user_id.to_string(), MENTION);
    }

    fn push_span(&mut self, sigil: char, name: &str, user_id: String, kind: u8) {
        self.text.push(' ');
        let start = self.text.chars().count();
        self.text.push(sigil);
        self.text.push_str(name);
        let end = self.text.chars().count();

        self.text_extra.push(TextExtra {
            start,
            end,
            user_id,
            kind,
            hashtag_name: name.to_string(),
        });
    }
}

#[derive(Debug, Deserialize)]
struct HashtagSuggestions {
    #[serde(default)]
    sug_list: Vec<HashtagSuggestion>,
}

#[derive(Debug, Deserialize)]
struct HashtagSuggestion {
    cha_name: String,
}

#[derive(Debug, Deserialize)]
struct UserSearch {
    #[serde(default)]
    user_list: Vec<UserHit>,
}

#[derive(Debug, Deserialize)]
struct UserHit {
    user_info: UserInfo,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    unique_id: String,
    uid: String,
}

/// Resolve every tag and mention and build the final caption.
///
/// A non-2xx lookup aborts; an unexpected body falls back to the raw name.
pub async fn resolve_caption(
    http: &Client,
    config: &PlatformConfig,
    title: &str,
    tags: &[String],
    mentions: &[String],
) -> PlatformResult<Caption> {
    let mut caption = Caption::new(title);

    for tag in tags {
        let url = format!("{}/api/upload/challenge/sug/", config.www_base);
        let body = send(
            PublishStep::TagLookup,
            http.get(url).query(&[("keyword", tag.as_str())]),
        )
        .await?
        .text()
        .await?;

        let name = serde_json::from_str::<HashtagSuggestions>(&body)
            .ok()
            .and_then(|s| s.sug_list.into_iter().next())
            .map(|s| s.cha_name)
            .unwrap_or_else(|| tag.clone());
        debug!(tag = %tag, resolved = %name, "Resolved hashtag");
        caption.push_hashtag(&name);
    }

    for mention in mentions {
        let url = format!("{}/api/upload/search/user/", config.web_base);
        let body = send(
            PublishStep::TagLookup,
            http.get(url).query(&[("keyword", mention.as_str())]),
        )
        .await?
        .text()
        .await?;

        let (name, user_id) = serde_json::from_str::<UserSearch>(&body)
            .ok()
            .and_then(|s| s.user_list.into_iter().next())
            .map(|hit| (hit.user_info.unique_id, hit.user_info.uid))
            .unwrap_or_else(|| (mention.clone(), String::new()));
        debug!(mention = %mention, resolved = %name, "Resolved mention");
        caption.push_mention(&name, &user_id);
    }

    Ok(caption)
}
