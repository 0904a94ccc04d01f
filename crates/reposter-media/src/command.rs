//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::FfmpegProgress;

/// Lines of non-progress stderr kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// One `-i` input with the arguments that precede it.
#[derive(Debug, Clone)]
struct FfmpegInput {
    path: PathBuf,
    args: Vec<String>,
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Inputs in `-i` order
    inputs: Vec<FfmpegInput>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after the last -i)
    output_args: Vec<String>,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command with a single input.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            inputs: vec![FfmpegInput {
                path: input.as_ref().to_path_buf(),
                args: Vec::new(),
            }],
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
        }
    }

    /// Add another input with its own input arguments.
    pub fn add_input<I, S>(mut self, path: impl AsRef<Path>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push(FfmpegInput {
            path: path.as_ref().to_path_buf(),
            args: args.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Map a stream or filter label into the output.
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set target video bitrate in bits/second.
    pub fn video_bitrate(self, bps: u64) -> Self {
        self.output_arg("-b:v").output_arg(bps.to_string())
    }

    /// Set target audio bitrate in bits/second.
    pub fn audio_bitrate(self, bps: u64) -> Self {
        self.output_arg("-b:a").output_arg(bps.to_string())
    }

    /// Select a two-pass encode pass, with pass logs written under `log_prefix`.
    pub fn pass(self, pass: u8, log_prefix: impl AsRef<Path>) -> Self {
        self.output_arg("-pass")
            .output_arg(pass.to_string())
            .output_arg("-passlogfile")
            .output_arg(log_prefix.as_ref().to_string_lossy().to_string())
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        // Overwrite, quiet logs, key=value progress on stderr
        let mut args: Vec<String> = ["-y", "-v", "error", "-progress", "pipe:2"]
            .into_iter()
            .map(String::from)
            .collect();

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Platform null device, used as the output of analysis passes.
pub fn null_device() -> &'static str {
    if cfg!(windows) {
        "NUL"
    } else {
        "/dev/null"
    }
}

/// Runner for FFmpeg commands with progress tracking and a timeout.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    /// Create a new runner without a timeout.
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    /// Run an FFmpeg command.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run an FFmpeg command with progress callback.
    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, progress_callback: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;
        let mut reader = BufReader::new(stderr).lines();

        // Progress lines go to the callback, everything else is kept for errors
        let stderr_handle = tokio::spawn(async move {
            let mut current = FfmpegProgress::default();
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = reader.next_line().await {
                if FfmpegProgress::is_progress_line(&line) {
                    if let Some(progress) = current.apply_line(&line) {
                        progress_callback(progress);
                    }
                } else if !line.trim().is_empty() {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }

            tail.into_iter().collect::<Vec<_>>().join("\n")
        });

        let result = self.wait_for_completion(&mut child).await;
        let stderr_tail = stderr_handle.await.unwrap_or_default();

        match result {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(MediaError::encode_failed(
                "FFmpeg exited with non-zero status",
                (!stderr_tail.is_empty()).then_some(stderr_tail),
                status.code(),
            )),
            Err(e) => Err(e),
        }
    }

    /// Wait for child process, killing it if the timeout elapses.
    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<std::process::ExitStatus> {
        let Some(timeout_secs) = self.timeout_secs else {
            return Ok(child.wait().await?);
        };

        match tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait()).await {
            Ok(status) => Ok(status?),
            Err(_) => {
                warn!("FFmpeg timed out after {} seconds, killing process", timeout_secs);
                let _ = child.kill().await;
                Err(MediaError::Timeout(timeout_secs))
            }
        }
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

/// Check if yt-dlp is available.
pub fn check_ytdlp() -> MediaResult<PathBuf> {
    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("input.mp4", "output.mp4")
            .video_codec("libx264")
            .video_bitrate(1_500_000)
            .audio_bitrate(128_000);

        let args = cmd.build_args();
        assert_eq!(args.first().map(String::as_str), Some("-y"));
        assert!(args.contains(&"-c:v".to_string()));
        assert!(args.contains(&"1500000".to_string()));
        assert!(args.contains(&"128000".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("output.mp4"));
    }

    #[test]
    fn test_input_args_precede_their_input() {
        let cmd = FfmpegCommand::new("source.mp4", "out.mp4")
            .add_input("overlay.mp4", ["-stream_loop", "-1"])
            .map("[v]");
        let args = cmd.build_args();

        let loop_pos = args.iter().position(|a| a == "-stream_loop").unwrap();
        let overlay_pos = args.iter().position(|a| a == "overlay.mp4").unwrap();
        let source_pos = args.iter().position(|a| a == "source.mp4").unwrap();

        assert!(source_pos < loop_pos);
        assert_eq!(overlay_pos, loop_pos + 3);
        assert_eq!(args[overlay_pos - 1], "-i");
    }

    #[test]
    fn test_pass_arguments() {
        let args = FfmpegCommand::new("in.mp4", null_device())
            .pass(1, "/tmp/work/ffmpeg2pass")
            .build_args();
        let pass_pos = args.iter().position(|a| a == "-pass").unwrap();
        assert_eq!(args[pass_pos + 1], "1");
        assert_eq!(args[pass_pos + 2], "-passlogfile");
        assert_eq!(args[pass_pos + 3], "/tmp/work/ffmpeg2pass");
    }

    #[test]
    fn test_runner_timeout_is_at_least_one_second() {
        let runner = FfmpegRunner::new().with_timeout(Duration::from_millis(10));
        assert_eq!(runner.timeout_secs, Some(1));
    }
}
