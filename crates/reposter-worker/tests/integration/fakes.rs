//! In-memory stand-ins for the worker's external services.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use reposter_media::{MediaError, MediaResult, Retriever, Transcoder};
use reposter_models::{PublishJob, ScheduleWindow, SessionCredential, SourceVideo, UploadCursor, VideoId};
use reposter_notify::{Notification, Notifier, NotifyResult};
use reposter_platform::{
    PlatformClient, PlatformError, PlatformResult, PublishReceipt, PublishStep, SourceFeed,
};
use reposter_store::{keys, spawn_credential_owner, CursorStore, EnvStore, StoreError, StoreResult};
use reposter_worker::{Pipeline, PollSettings, Poller, SlideshowPolicy};

pub const TARGET: &str = "creator";
pub const OPERATOR: &str = "42";

pub fn video(id: u64) -> SourceVideo {
    SourceVideo {
        id: VideoId::from(id.to_string()),
        caption: format!("video {} #fyp #dance", id),
        created_at: Utc.timestamp_opt(1_700_000_000 + id as i64, 0).unwrap(),
        is_slideshow: false,
    }
}

pub fn slideshow(id: u64) -> SourceVideo {
    SourceVideo {
        is_slideshow: true,
        ..video(id)
    }
}

/// Account whose videos are listed newest first.
pub struct FakeFeed {
    pub count: Mutex<u64>,
    newest_first: Vec<SourceVideo>,
    pub listing_requests: Mutex<Vec<usize>>,
    /// Answer count requests with this HTTP status
    pub fail_status: Mutex<Option<u16>>,
}

impl FakeFeed {
    /// Account holding `videos`; its count is their number.
    pub fn with_videos(mut videos: Vec<SourceVideo>) -> Self {
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self {
            count: Mutex::new(videos.len() as u64),
            newest_first: videos,
            listing_requests: Mutex::new(Vec::new()),
            fail_status: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SourceFeed for FakeFeed {
    async fn video_count(&self, _user: &str) -> PlatformResult<u64> {
        if let Some(status) = *self.fail_status.lock().unwrap() {
            return Err(PlatformError::network(PublishStep::UserDetail, status, "unavailable"));
        }
        Ok(*self.count.lock().unwrap())
    }

    async fn recent_videos(&self, _user: &str, count: usize) -> PlatformResult<Vec<SourceVideo>> {
        self.listing_requests.lock().unwrap().push(count);
        Ok(self.newest_first.iter().take(count).cloned().collect())
    }
}

#[derive(Default)]
pub struct FakeRetriever {
    pub urls: Mutex<Vec<String>>,
    /// Fail when the URL ends with this id
    pub fail_id: Option<String>,
}

#[async_trait]
impl Retriever for FakeRetriever {
    async fn retrieve(&self, video_url: &str, dest: &Path) -> MediaResult<PathBuf> {
        self.urls.lock().unwrap().push(video_url.to_string());
        if let Some(id) = &self.fail_id {
            if video_url.ends_with(&format!("/video/{}", id)) {
                return Err(MediaError::download_failed("no download link"));
            }
        }
        tokio::fs::write(dest, b"source").await?;
        Ok(dest.to_path_buf())
    }
}

#[derive(Default)]
pub struct FakeTranscoder {
    pub sources: Mutex<Vec<PathBuf>>,
    /// Panic while composing this source's work directory name
    pub panic_id: Option<String>,
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn compose(&self, source: &Path, work_dir: &Path) -> MediaResult<PathBuf> {
        self.sources.lock().unwrap().push(source.to_path_buf());
        if let Some(id) = &self.panic_id {
            if work_dir.ends_with(id) {
                panic!("transcoder crashed");
            }
        }
        let output = work_dir.join("output-compressed.mp4");
        tokio::fs::write(&output, b"composed").await?;
        tokio::fs::write(work_dir.join("ffmpeg2pass-0.log"), b"stats").await?;
        Ok(output)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    Succeed,
    ExpireCredential,
    Reject,
}

pub struct FakePlatform {
    pub mode: PublishMode,
    pub jobs: Mutex<Vec<(String, PublishJob)>>,
}

impl FakePlatform {
    pub fn new(mode: PublishMode) -> Self {
        Self {
            mode,
            jobs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PlatformClient for FakePlatform {
    async fn publish(
        &self,
        credential: &SessionCredential,
        job: &PublishJob,
    ) -> PlatformResult<PublishReceipt> {
        assert!(job.media_path.exists(), "composed file must exist at publish time");
        self.jobs
            .lock()
            .unwrap()
            .push((credential.expose().to_string(), job.clone()));

        match self.mode {
            PublishMode::Succeed => Ok(PublishReceipt {
                video_id: format!("v{}", self.jobs.lock().unwrap().len()),
                project_id: "p".to_string(),
                schedule: ScheduleWindow::Immediate,
            }),
            PublishMode::ExpireCredential => Err(PlatformError::CredentialExpired),
            PublishMode::Reject => Err(PlatformError::PublishRejected {
                status_code: 5,
                body: "{\"status_code\":5}".to_string(),
            }),
        }
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl FakeNotifier {
    pub fn contents(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.content.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(&self, notification: &Notification) -> NotifyResult<()> {
        if let Some(attachment) = &notification.attachment {
            assert!(attachment.path.exists(), "attachment must exist when sent");
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Cursor kept in memory, with every save recorded.
pub struct MemoryCursorStore {
    cursor: Mutex<UploadCursor>,
    pub saves: Mutex<Vec<u64>>,
    /// Fail the save with this 1-based index
    pub fail_on_save: Option<usize>,
}

impl MemoryCursorStore {
    pub fn new(cursor: u64) -> Self {
        Self {
            cursor: Mutex::new(UploadCursor::new(cursor)),
            saves: Mutex::new(Vec::new()),
            fail_on_save: None,
        }
    }

    pub fn current(&self) -> u64 {
        self.cursor.lock().unwrap().value()
    }
}

#[async_trait]
impl CursorStore for MemoryCursorStore {
    async fn load(&self) -> StoreResult<UploadCursor> {
        Ok(*self.cursor.lock().unwrap())
    }

    async fn save(&self, cursor: UploadCursor) -> StoreResult<()> {
        let attempt = self.saves.lock().unwrap().len() + 1;
        if self.fail_on_save == Some(attempt) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.saves.lock().unwrap().push(cursor.value());
        *self.cursor.lock().unwrap() = cursor;
        Ok(())
    }
}

/// A poller wired to fakes, plus handles to inspect them.
pub struct Harness {
    pub poller: Poller,
    pub feed: Arc<FakeFeed>,
    pub cursor: Arc<MemoryCursorStore>,
    pub retriever: Arc<FakeRetriever>,
    pub transcoder: Arc<FakeTranscoder>,
    pub platform: Arc<FakePlatform>,
    pub notifier: Arc<FakeNotifier>,
    pub work_root: PathBuf,
    _dir: TempDir,
}

pub struct HarnessBuilder {
    pub feed: FakeFeed,
    pub cursor: MemoryCursorStore,
    pub retriever: FakeRetriever,
    pub transcoder: FakeTranscoder,
    pub mode: PublishMode,
    pub policy: SlideshowPolicy,
}

impl HarnessBuilder {
    pub fn new(videos: Vec<SourceVideo>, cursor: u64) -> Self {
        Self {
            feed: FakeFeed::with_videos(videos),
            cursor: MemoryCursorStore::new(cursor),
            retriever: FakeRetriever::default(),
            transcoder: FakeTranscoder::default(),
            mode: PublishMode::Succeed,
            policy: SlideshowPolicy::Skip,
        }
    }

    pub fn build(self) -> Harness {
        let dir = TempDir::new().unwrap();
        let env = EnvStore::new(dir.path().join(".env"));
        env.set_key(keys::SESSION_ID, "session-abc").unwrap();
        let (credentials, _owner) =
            spawn_credential_owner(SessionCredential::new("session-abc"), env);

        let feed = Arc::new(self.feed);
        let cursor = Arc::new(self.cursor);
        let retriever = Arc::new(self.retriever);
        let transcoder = Arc::new(self.transcoder);
        let platform = Arc::new(FakePlatform::new(self.mode));
        let notifier = Arc::new(FakeNotifier::default());
        let work_root = dir.path().join("work");

        let pipeline = Arc::new(Pipeline {
            retriever: retriever.clone(),
            transcoder: transcoder.clone(),
            platform: platform.clone(),
            notifier: notifier.clone(),
            credentials,
            target_user: TARGET.to_string(),
            operator_id: OPERATOR.to_string(),
        });

        let poller = Poller::new(
            feed.clone(),
            cursor.clone(),
            pipeline,
            PollSettings {
                target_user: TARGET.to_string(),
                work_dir: work_root.clone(),
                slideshow_policy: self.policy,
                poll_interval: Duration::from_secs(1200),
            },
        );

        Harness {
            poller,
            feed,
            cursor,
            retriever,
            transcoder,
            platform,
            notifier,
            work_root,
            _dir: dir,
        }
    }
}

impl Harness {
    /// Video ids handed to the retriever, in order.
    pub fn retrieved_ids(&self) -> Vec<String> {
        self.retriever
            .urls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|url| url.rsplit('/').next().map(str::to_string))
            .collect()
    }
}
