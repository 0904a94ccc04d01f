//! FFmpeg progress parsing.

use serde::{Deserialize, Serialize};

/// Progress information from FFmpeg.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Progress percentage given total duration in seconds.
    pub fn percentage(&self, total_duration_secs: f64) -> f64 {
        if total_duration_secs <= 0.0 {
            return 0.0;
        }
        let total_ms = total_duration_secs * 1000.0;
        ((self.out_time_ms as f64 / total_ms) * 100.0).min(100.0)
    }

    /// Apply one `key=value` line of `-progress` output.
    ///
    /// Returns a snapshot whenever a `progress=` line closes a block.
    pub fn apply_line(&mut self, line: &str) -> Option<FfmpegProgress> {
        let (key, value) = line.trim().split_once('=')?;

        match key {
            "out_time_ms" | "out_time_us" => {
                // Both keys carry microseconds in current FFmpeg builds
                if let Ok(us) = value.parse::<i64>() {
                    self.out_time_ms = us / 1000;
                }
            }
            "frame" => {
                if let Ok(frame) = value.parse() {
                    self.frame = frame;
                }
            }
            "speed" => {
                if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                    self.speed = speed;
                }
            }
            "progress" => {
                if value == "end" {
                    self.is_complete = true;
                }
                return Some(self.clone());
            }
            _ => {}
        }

        None
    }

    /// True if a stderr line is part of the `-progress` key/value stream.
    pub fn is_progress_line(line: &str) -> bool {
        const KEYS: &[&str] = &[
            "frame", "fps", "stream_", "bitrate", "total_size", "out_time", "dup_frames",
            "drop_frames", "speed", "progress",
        ];
        match line.split_once('=') {
            Some((key, _)) => KEYS.iter().any(|k| key.starts_with(k)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percentage() {
        let progress = FfmpegProgress {
            out_time_ms: 5000,
            ..Default::default()
        };

        assert!((progress.percentage(10.0) - 50.0).abs() < 0.01);
        assert!((progress.percentage(5.0) - 100.0).abs() < 0.01);
        assert_eq!(progress.percentage(0.0), 0.0);
    }

    #[test]
    fn test_apply_lines() {
        let mut progress = FfmpegProgress::default();

        assert!(progress.apply_line("out_time_us=5000000").is_none());
        assert_eq!(progress.out_time_ms, 5000);

        progress.apply_line("speed=1.5x");
        assert!((progress.speed - 1.5).abs() < 0.01);

        progress.apply_line("speed=N/A");
        assert!((progress.speed - 1.5).abs() < 0.01);

        let snapshot = progress.apply_line("progress=end").unwrap();
        assert!(snapshot.is_complete);
    }

    #[test]
    fn test_is_progress_line() {
        assert!(FfmpegProgress::is_progress_line("out_time_ms=100"));
        assert!(FfmpegProgress::is_progress_line("stream_0_0_q=28.0"));
        assert!(!FfmpegProgress::is_progress_line(
            "[libx264 @ 0x55] Error: width not divisible by 2"
        ));
    }
}
