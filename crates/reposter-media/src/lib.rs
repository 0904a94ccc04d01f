#![deny(unreachable_patterns)]
//! Video retrieval and FFmpeg CLI composition.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - Progress parsing from `-progress pipe:2`
//! - Timeouts on every transcoder subprocess
//! - Bitrate budgeting for size-targeted two-pass encodes
//! - The reaction-overlay composer
//! - Source retrieval through a downloader site or yt-dlp

pub mod bitrate;
pub mod command;
pub mod compose;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod retrieve;

pub use bitrate::BitrateBudget;
pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use compose::{ComposerConfig, FfmpegComposer, Transcoder};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use retrieve::{BrowserRetriever, Retriever, RetrieverKind, YtDlpRetriever};
