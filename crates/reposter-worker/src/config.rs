//! Worker configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reposter_media::RetrieverKind;
use reposter_models::SessionCredential;
use reposter_store::{keys, EnvStore};

use crate::error::{WorkerError, WorkerResult};

/// What to do with multi-image posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlideshowPolicy {
    /// Advance the cursor without touching the pipeline.
    #[default]
    Skip,
    /// Run the pipeline anyway.
    Attempt,
}

impl FromStr for SlideshowPolicy {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "attempt" => Ok(Self::Attempt),
            other => Err(WorkerError::config_error(format!(
                "SLIDESHOW_POLICY must be skip or attempt, got {other:?}"
            ))),
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Time between poll ticks
    pub poll_interval: Duration,
    /// Time between credential reminders
    pub reminder_interval: Duration,
    /// Parent of the per-video work directories
    pub work_dir: PathBuf,
    /// Reaction clips to stack under each video
    pub overlay_dir: PathBuf,
    /// Size ceiling of the composed file in kB
    pub size_limit_kb: u64,
    /// Timeout for each transcoder and yt-dlp invocation
    pub transcode_timeout: Duration,
    pub slideshow_policy: SlideshowPolicy,
    pub retriever: RetrieverKind,
    pub webdriver_url: String,
    pub downloader_url: String,
    /// Retries for feed reads
    pub feed_retries: u32,
    /// Prometheus listener, disabled when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1200), // 20 minutes
            reminder_interval: Duration::from_secs(2_419_200), // 4 weeks
            work_dir: PathBuf::from("/tmp/reposter"),
            overlay_dir: PathBuf::from("pointing_clips"),
            size_limit_kb: 25_000,
            transcode_timeout: Duration::from_secs(1800),
            slideshow_policy: SlideshowPolicy::Skip,
            retriever: RetrieverKind::Browser,
            webdriver_url: "http://localhost:9515".to_string(),
            downloader_url: "https://snaptik.app/".to_string(),
            feed_retries: 3,
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let defaults = Self::default();

        let slideshow_policy = match std::env::var("SLIDESHOW_POLICY") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.slideshow_policy,
        };
        let retriever = match std::env::var("RETRIEVER") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.retriever,
        };
        let metrics_addr = match std::env::var("METRICS_ADDR") {
            Ok(raw) if !raw.trim().is_empty() => Some(raw.trim().parse().map_err(|_| {
                WorkerError::config_error(format!("METRICS_ADDR is not a socket address: {raw:?}"))
            })?),
            _ => None,
        };

        Ok(Self {
            poll_interval: env_secs("POLL_INTERVAL_SECS").unwrap_or(defaults.poll_interval),
            reminder_interval: env_secs("REMINDER_INTERVAL_SECS")
                .unwrap_or(defaults.reminder_interval),
            work_dir: std::env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            overlay_dir: std::env::var("OVERLAY_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.overlay_dir),
            size_limit_kb: env_parse("SIZE_LIMIT_KB").unwrap_or(defaults.size_limit_kb),
            transcode_timeout: env_secs("TRANSCODE_TIMEOUT_SECS")
                .unwrap_or(defaults.transcode_timeout),
            slideshow_policy,
            retriever,
            webdriver_url: std::env::var("WEBDRIVER_URL").unwrap_or(defaults.webdriver_url),
            downloader_url: std::env::var("DOWNLOADER_URL").unwrap_or(defaults.downloader_url),
            feed_retries: env_parse("FEED_RETRIES").unwrap_or(defaults.feed_retries),
            metrics_addr,
        })
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_secs(key: &str) -> Option<Duration> {
    env_parse::<u64>(key)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// Account and channel settings read from the config file.
#[derive(Debug, Clone)]
pub struct AccountSettings {
    pub session: SessionCredential,
    /// Watched account handle
    pub target_user: String,
    /// Chat user pinged on failures and reminders
    pub operator_id: String,
    pub webhook_url: String,
    pub bot_token: String,
    pub guild_id: String,
}

impl AccountSettings {
    /// Load every required key, failing on the first one missing.
    pub fn load(store: &EnvStore) -> WorkerResult<Self> {
        Ok(Self {
            session: SessionCredential::new(store.require(keys::SESSION_ID)?),
            target_user: store
                .require(keys::TARGET_USER)?
                .trim_start_matches('@')
                .to_string(),
            operator_id: store.require(keys::OPERATOR_USER_ID)?,
            webhook_url: store.require(keys::WEBHOOK_URL)?,
            bot_token: store.require(keys::BOT_TOKEN)?,
            guild_id: store.require(keys::GUILD_ID)?,
        })
    }
}
