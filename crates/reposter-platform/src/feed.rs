//! Source feed: the watched account's video count and newest videos.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use reposter_models::{SourceVideo, VideoId};

use crate::config::{PlatformConfig, WEB_AID};
use crate::error::{PlatformResult, PublishStep};
use crate::http::{anonymous_client, send_json};
use crate::retry::{with_retry, RetryConfig};
use crate::signing::XBogus;

/// Largest page the listing endpoint serves.
const MAX_PAGE_SIZE: usize = 35;

/// Read access to the watched account.
#[async_trait]
pub trait SourceFeed: Send + Sync {
    /// Live total of videos on the account.
    async fn video_count(&self, user: &str) -> PlatformResult<u64>;

    /// Up to `count` most recent videos, newest first.
    async fn recent_videos(&self, user: &str, count: usize) -> PlatformResult<Vec<SourceVideo>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDetailResponse {
    user_info: UserInfo,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    user: UserIdentity,
    stats: UserStats,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserIdentity {
    sec_uid: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserStats {
    video_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemListResponse {
    #[serde(default)]
    item_list: Vec<FeedItem>,
    #[serde(default, deserialize_with = "de_cursor")]
    cursor: String,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedItem {
    id: String,
    #[serde(default)]
    desc: String,
    #[serde(deserialize_with = "de_unix_seconds")]
    create_time: i64,
    #[serde(default)]
    image_post: Option<serde_json::Value>,
}

impl FeedItem {
    fn into_source_video(self) -> SourceVideo {
        SourceVideo {
            id: VideoId::from(self.id),
            caption: self.desc,
            created_at: Utc
                .timestamp_opt(self.create_time, 0)
                .single()
                .unwrap_or_default(),
            is_slideshow: self.image_post.is_some_and(|v| !v.is_null()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrString {
    Num(i64),
    Str(String),
}

fn de_unix_seconds<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    match NumOrString::deserialize(d)? {
        NumOrString::Num(n) => Ok(n),
        NumOrString::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

fn de_cursor<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match NumOrString::deserialize(d)? {
        NumOrString::Num(n) => n.to_string(),
        NumOrString::Str(s) => s,
    })
}

/// [`SourceFeed`] backed by the public web API.
pub struct TiktokFeed {
    http: Client,
    config: PlatformConfig,
    signer: XBogus,
    retry: RetryConfig,
    sec_uids: RwLock<HashMap<String, String>>,
}

impl TiktokFeed {
    pub fn new(config: PlatformConfig, retry: RetryConfig) -> PlatformResult<Self> {
        let http = anonymous_client(&config)?;
        let signer = XBogus::new(&config.user_agent);
        Ok(Self {
            http,
            config,
            signer,
            retry,
            sec_uids: RwLock::new(HashMap::new()),
        })
    }

    fn signed_url(&self, path: &str, query: &str) -> String {
        let signature = self.signer.sign(query, "");
        format!(
            "{}{}?{}&X-Bogus={}",
            self.config.www_base,
            path,
            query,
            urlencoding::encode(&signature)
        )
    }

    async fn user_detail(&self, user: &str) -> PlatformResult<UserInfo> {
        let query = format!("uniqueId={}&aid={}", urlencoding::encode(user), WEB_AID);
        let response: UserDetailResponse = with_retry(&self.retry, "user_detail", || {
            let url = self.signed_url("/api/user/detail/", &query);
            send_json(PublishStep::UserDetail, self.http.get(url))
        })
        .await?;

        let info = response.user_info;
        self.sec_uids
            .write()
            .await
            .insert(user.to_string(), info.user.sec_uid.clone());
        Ok(info)
    }

    async fn sec_uid(&self, user: &str) -> PlatformResult<String> {
        if let Some(sec_uid) = self.sec_uids.read().await.get(user) {
            return Ok(sec_uid.clone());
        }
        Ok(self.user_detail(user).await?.user.sec_uid)
    }

    async fn page(&self, sec_uid: &str, count: usize, cursor: &str) -> PlatformResult<ItemListResponse> {
        let query = format!(
            "secUid={}&count={}&cursor={}&aid={}",
            urlencoding::encode(sec_uid),
            count,
            urlencoding::encode(cursor),
            WEB_AID
        );
        with_retry(&self.retry, "item_list", || {
            let url = self.signed_url("/api/post/item_list/", &query);
            send_json(PublishStep::ItemList, self.http.get(url))
        })
        .await
    }
}

#[async_trait]
impl SourceFeed for TiktokFeed {
    async fn video_count(&self, user: &str) -> PlatformResult<u64> {
        let info = self.user_detail(user).await?;
        debug!(user, video_count = info.stats.video_count, "Fetched account stats");
        Ok(info.stats.video_count)
    }

    async fn recent_videos(&self, user: &str, count: usize) -> PlatformResult<Vec<SourceVideo>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let sec_uid = self.sec_uid(user).await?;
        let mut videos = Vec::with_capacity(count);
        let mut cursor = "0".to_string();

        while videos.len() < count {
            let page_size = (count - videos.len()).min(MAX_PAGE_SIZE);
            let page = self.page(&sec_uid, page_size, &cursor).await?;
            let fetched = page.item_list.len();

            videos.extend(
                page.item_list
                    .into_iter()
                    .map(FeedItem::into_source_video)
                    .take(count - videos.len()),
            );

            if !page.has_more || fetched == 0 || page.cursor.is_empty() || page.cursor == cursor {
                break;
            }
            cursor = page.cursor;
        }

        if videos.len() < count {
            warn!(user, fetched = videos.len(), wanted = count, "Listing ended early");
        }

        debug!(user, fetched = videos.len(), "Fetched recent videos");
        Ok(videos)
    }
}
