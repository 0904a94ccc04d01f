//! Reaction-overlay composition.
//!
//! A randomly chosen reaction clip is looped, scaled to the source width and
//! stacked under the source video. The stacked result is then squeezed under
//! a file-size ceiling with a two-pass, bitrate-targeted encode.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use tokio::fs;
use tracing::{debug, info};

use crate::bitrate::BitrateBudget;
use crate::command::{null_device, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::remove_transcoder_artifacts;
use crate::probe::{probe_video, VideoInfo};

/// Chat upload ceiling the output has to fit, in kB.
pub const DEFAULT_SIZE_LIMIT_KB: u64 = 25_000;

const STACKED_FILE: &str = "stacked.mp4";
const OUTPUT_FILE: &str = "output-compressed.mp4";
const PASS_LOG_PREFIX: &str = "ffmpeg2pass";

/// Turns a retrieved source video into the file that gets published.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Compose `source` inside `work_dir` and return the output path.
    async fn compose(&self, source: &Path, work_dir: &Path) -> MediaResult<PathBuf>;
}

/// Composer configuration.
#[derive(Debug, Clone)]
pub struct ComposerConfig {
    /// Directory of reaction clips (`.mp4`)
    pub overlay_dir: PathBuf,
    /// Output size ceiling in kB
    pub size_limit_kb: u64,
    /// Per-ffmpeg-invocation timeout
    pub timeout: Duration,
    pub video_codec: String,
    pub audio_codec: String,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            overlay_dir: PathBuf::from("pointing_clips"),
            size_limit_kb: DEFAULT_SIZE_LIMIT_KB,
            timeout: Duration::from_secs(1800),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }
}

/// FFmpeg-backed [`Transcoder`].
#[derive(Debug, Clone)]
pub struct FfmpegComposer {
    config: ComposerConfig,
    runner: FfmpegRunner,
}

impl FfmpegComposer {
    pub fn new(config: ComposerConfig) -> Self {
        let runner = FfmpegRunner::new().with_timeout(config.timeout);
        Self { config, runner }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Overlay a reaction clip from `overlay_dir` and fit the result in `size_limit_kb`.
    pub async fn compose_with(
        &self,
        source: &Path,
        overlay_dir: &Path,
        size_limit_kb: u64,
        work_dir: &Path,
    ) -> MediaResult<PathBuf> {
        fs::create_dir_all(work_dir).await?;

        let overlay = pick_overlay(overlay_dir).await?;
        let info = probe_video(source).await?;
        info!(
            overlay = %overlay.display(),
            width = info.width,
            height = info.height,
            duration = info.duration,
            "Stacking reaction clip under source"
        );

        let stacked = work_dir.join(STACKED_FILE);
        self.stack(source, &overlay, &info, &stacked).await?;

        let output = work_dir.join(OUTPUT_FILE);
        let budget = self
            .compress(&stacked, &output, size_limit_kb, work_dir)
            .await?;
        info!(
            video_bps = budget.video_arg(),
            audio_bps = budget.audio_arg(),
            "Compressed composed video"
        );

        Ok(output)
    }

    /// Stack `overlay` under `source`, keeping the source's size and audio.
    pub async fn stack(
        &self,
        source: &Path,
        overlay: &Path,
        info: &VideoInfo,
        output: &Path,
    ) -> MediaResult<()> {
        if info.width == 0 || info.height == 0 {
            return Err(MediaError::InvalidVideo(format!(
                "source has no usable dimensions: {}x{}",
                info.width, info.height
            )));
        }

        let cmd = FfmpegCommand::new(source, output)
            .add_input(overlay, ["-stream_loop", "-1"])
            .filter_complex(build_stack_filter(info.width, info.height))
            .map("[v]")
            .map("0:a?")
            .output_args(["-fps_mode", "vfr"])
            .video_codec(&self.config.video_codec)
            .output_args(["-preset", "veryfast", "-crf", "18"])
            .audio_codec(&self.config.audio_codec);

        let duration = info.duration;
        self.runner
            .run_with_progress(&cmd, move |p| {
                debug!("stack progress {:.0}%", p.percentage(duration));
            })
            .await
    }

    /// Two-pass encode of `input` so that it fits in `size_limit_kb`.
    pub async fn compress(
        &self,
        input: &Path,
        output: &Path,
        size_limit_kb: u64,
        work_dir: &Path,
    ) -> MediaResult<BitrateBudget> {
        let info = probe_video(input).await?;
        let budget = BitrateBudget::for_target(
            size_limit_kb,
            info.duration,
            info.audio_bitrate.map(|b| b as f64),
        )?;
        let log_prefix = work_dir.join(PASS_LOG_PREFIX);

        let analysis = FfmpegCommand::new(input, null_device())
            .video_codec(&self.config.video_codec)
            .video_bitrate(budget.video_arg())
            .pass(1, &log_prefix)
            .output_args(["-an", "-f", "mp4"]);
        self.runner.run(&analysis).await?;

        let encode = FfmpegCommand::new(input, output)
            .video_codec(&self.config.video_codec)
            .video_bitrate(budget.video_arg())
            .pass(2, &log_prefix)
            .audio_codec(&self.config.audio_codec)
            .audio_bitrate(budget.audio_arg());

        let duration = info.duration;
        let result = self
            .runner
            .run_with_progress(&encode, move |p| {
                debug!("encode progress {:.0}%", p.percentage(duration));
            })
            .await;

        let removed = remove_transcoder_artifacts(work_dir).await?;
        debug!(removed, "Removed two-pass statistics files");

        result.map(|_| budget)
    }
}

#[async_trait]
impl Transcoder for FfmpegComposer {
    async fn compose(&self, source: &Path, work_dir: &Path) -> MediaResult<PathBuf> {
        self.compose_with(
            source,
            &self.config.overlay_dir,
            self.config.size_limit_kb,
            work_dir,
        )
        .await
    }
}

/// Filter graph stacking input 0 over input 1 at input 0's size.
pub fn build_stack_filter(width: u32, height: u32) -> String {
    format!(
        "[1:v]scale={w}:-2[overlay];\
         [0:v][overlay]vstack=inputs=2:shortest=1,scale={w}:{h},setsar=1[v]",
        w = width,
        h = height
    )
}

/// Choose one `.mp4` clip from `dir` at random.
pub async fn pick_overlay(dir: &Path) -> MediaResult<PathBuf> {
    let mut clips = Vec::new();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MediaError::NoOverlayClips(dir.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_mp4 = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mp4"));
        if is_mp4 {
            clips.push(path);
        }
    }

    clips
        .choose(&mut rand::rng())
        .cloned()
        .ok_or_else(|| MediaError::NoOverlayClips(dir.to_path_buf()))
}
