//! Source video retrieval.
//!
//! Two strategies are available: driving a downloader site through a
//! WebDriver session, or shelling out to yt-dlp.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use thirtyfour::prelude::*;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::command::check_ytdlp;
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::move_file;

/// Fetches a source video to a local file.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Download `video_url` to `dest`, returning the written path.
    async fn retrieve(&self, video_url: &str, dest: &Path) -> MediaResult<PathBuf>;
}

/// Which retriever implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetrieverKind {
    #[default]
    Browser,
    YtDlp,
}

impl FromStr for RetrieverKind {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "browser" => Ok(Self::Browser),
            "ytdlp" | "yt-dlp" => Ok(Self::YtDlp),
            other => Err(MediaError::internal(format!("unknown retriever: {other}"))),
        }
    }
}

const URL_INPUT: &str = "#url";
const SUBMIT_BUTTON: &str = "#hero > div > form > button";
const DOWNLOAD_LINK: &str = "#download > div > div.video-links > a:nth-child(1)";

/// Drives a downloader site through a WebDriver endpoint.
#[derive(Debug, Clone)]
pub struct BrowserRetriever {
    webdriver_url: String,
    downloader_url: String,
    link_timeout: Duration,
    http: reqwest::Client,
}

impl BrowserRetriever {
    pub fn new(webdriver_url: impl Into<String>, downloader_url: impl Into<String>) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            downloader_url: downloader_url.into(),
            link_timeout: Duration::from_secs(60),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_link_timeout(mut self, timeout: Duration) -> Self {
        self.link_timeout = timeout;
        self
    }

    async fn start_session(&self) -> MediaResult<WebDriver> {
        let mut caps = DesiredCapabilities::chrome();
        for arg in [
            "--headless=new",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-gpu",
            "--blink-settings=imagesEnabled=false",
        ] {
            caps.add_arg(arg)?;
        }
        Ok(WebDriver::new(&self.webdriver_url, caps).await?)
    }

    /// Resolve the direct media link for `video_url` on the downloader site.
    async fn resolve_link(&self, driver: &WebDriver, video_url: &str) -> MediaResult<String> {
        driver.goto(&self.downloader_url).await?;

        let input = driver
            .query(By::Css(URL_INPUT))
            .wait(self.link_timeout, Duration::from_millis(500))
            .first()
            .await?;
        input.send_keys(video_url).await?;

        driver.query(By::Css(SUBMIT_BUTTON)).first().await?.click().await?;

        let link = driver
            .query(By::Css(DOWNLOAD_LINK))
            .wait(self.link_timeout, Duration::from_millis(500))
            .first()
            .await?;

        link.attr("href")
            .await?
            .filter(|href| !href.is_empty())
            .ok_or_else(|| MediaError::browser("download link has no href"))
    }

    /// Stream `link` to a `.part` file next to `dest`, then move it into place.
    async fn download(&self, link: &str, dest: &Path) -> MediaResult<()> {
        let mut response = self
            .http
            .get(link)
            .send()
            .await
            .map_err(|e| MediaError::download_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MediaError::download_failed(format!(
                "downloader returned {}",
                response.status()
            )));
        }

        let partial = dest.with_extension("part");
        let mut file = tokio::fs::File::create(&partial).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| MediaError::download_failed(e.to_string()))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        if written == 0 {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(MediaError::download_failed("empty response body"));
        }

        debug!(bytes = written, "Downloaded source video");
        move_file(&partial, dest).await
    }
}

#[async_trait]
impl Retriever for BrowserRetriever {
    async fn retrieve(&self, video_url: &str, dest: &Path) -> MediaResult<PathBuf> {
        info!(url = video_url, "Retrieving video through downloader site");
        let driver = self.start_session().await?;

        let link = self.resolve_link(&driver, video_url).await;
        if let Err(e) = driver.quit().await {
            warn!("Failed to quit browser session: {}", e);
        }

        self.download(&link?, dest).await?;
        Ok(dest.to_path_buf())
    }
}

/// Downloads with the `yt-dlp` command line tool.
#[derive(Debug, Clone)]
pub struct YtDlpRetriever {
    timeout: Duration,
}

impl YtDlpRetriever {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Arguments passed to yt-dlp for one download.
    pub fn build_args(video_url: &str, dest: &Path) -> Vec<String> {
        vec![
            "-f".to_string(),
            "mp4/best".to_string(),
            "--no-playlist".to_string(),
            "--quiet".to_string(),
            "-o".to_string(),
            dest.to_string_lossy().to_string(),
            video_url.to_string(),
        ]
    }
}

impl Default for YtDlpRetriever {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}

#[async_trait]
impl Retriever for YtDlpRetriever {
    async fn retrieve(&self, video_url: &str, dest: &Path) -> MediaResult<PathBuf> {
        let ytdlp = check_ytdlp()?;
        info!(url = video_url, "Retrieving video with yt-dlp");

        let child = Command::new(ytdlp)
            .args(Self::build_args(video_url, dest))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| MediaError::Timeout(self.timeout.as_secs()))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::download_failed(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        if !tokio::fs::try_exists(dest).await? {
            return Err(MediaError::FileNotFound(dest.to_path_buf()));
        }
        Ok(dest.to_path_buf())
    }
}
