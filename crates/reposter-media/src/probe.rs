//! Stream geometry, duration and audio bitrate via ffprobe.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// What the composer needs to know about a clip.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    /// Seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    /// Bits/second of the first audio stream, if it reports one
    pub audio_bitrate: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    bit_rate: Option<String>,
}

/// Run ffprobe on `path`.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    check_ffprobe()?;

    let child = Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json"])
        .args(["-show_entries", "format=duration:stream=codec_type,width,height,bit_rate"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(PROBE_TIMEOUT, child).await {
        Ok(result) => result?,
        Err(_) => return Err(MediaError::Timeout(PROBE_TIMEOUT.as_secs())),
    };

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("ffprobe exited with {}", output.status),
            stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
        });
    }

    parse_report(&output.stdout)
}

fn parse_report(json: &[u8]) -> MediaResult<VideoInfo> {
    let report: ProbeReport = serde_json::from_slice(json)?;

    let video = report
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidVideo("no video stream".to_string()))?;

    let audio_bitrate = report
        .streams
        .iter()
        .find(|s| s.codec_type == "audio")
        .and_then(|s| s.bit_rate.as_deref())
        .and_then(|b| b.parse().ok());

    let duration = report
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse().ok())
        .unwrap_or(0.0);

    Ok(VideoInfo {
        duration,
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        audio_bitrate,
    })
}
