//! Bitrate budgeting for size-targeted two-pass encodes.
//!
//! Encoding bit rate reference: total = size / duration, with a container
//! overhead factor of 1.073741824 (2^30 / 10^9).

use crate::error::{MediaError, MediaResult};

/// Lowest audio bitrate worth encoding, in bits/second.
pub const MIN_AUDIO_BITRATE: f64 = 32_000.0;

/// Highest audio bitrate spent on a size-limited encode, in bits/second.
pub const MAX_AUDIO_BITRATE: f64 = 256_000.0;

const OVERHEAD_FACTOR: f64 = 1.073741824;

/// Bitrates for one size-targeted encode, all in bits/second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BitrateBudget {
    pub total_bps: f64,
    pub audio_bps: f64,
    pub video_bps: f64,
}

impl BitrateBudget {
    /// Total bitrate that makes `duration_secs` of media fit `size_limit_kb`.
    pub fn total_bitrate(size_limit_kb: u64, duration_secs: f64) -> f64 {
        (size_limit_kb as f64 * 1024.0 * 8.0) / (OVERHEAD_FACTOR * duration_secs)
    }

    /// Split the total budget between audio and video.
    ///
    /// The source audio bitrate is kept when ten times it still fits the
    /// total; otherwise audio gets a tenth of the total. Audio is clamped to
    /// `[MIN_AUDIO_BITRATE, MAX_AUDIO_BITRATE]` unless the minimum alone
    /// would eat the whole budget.
    pub fn for_target(
        size_limit_kb: u64,
        duration_secs: f64,
        source_audio_bps: Option<f64>,
    ) -> MediaResult<Self> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(MediaError::InvalidVideo(format!(
                "cannot budget bitrate for duration {}",
                duration_secs
            )));
        }

        let total_bps = Self::total_bitrate(size_limit_kb, duration_secs);

        let mut audio_bps = match source_audio_bps {
            Some(source) if source > 0.0 && source * 10.0 <= total_bps => source,
            _ => total_bps / 10.0,
        };
        audio_bps = audio_bps.clamp(MIN_AUDIO_BITRATE, MAX_AUDIO_BITRATE);
        if audio_bps >= total_bps {
            audio_bps = total_bps / 10.0;
        }

        Ok(Self {
            total_bps,
            audio_bps,
            video_bps: total_bps - audio_bps,
        })
    }

    /// Video bitrate as passed to `-b:v`.
    pub fn video_arg(&self) -> u64 {
        self.video_bps.floor() as u64
    }

    /// Audio bitrate as passed to `-b:a`.
    pub fn audio_arg(&self) -> u64 {
        self.audio_bps.floor() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_bitrate_ten_seconds() {
        let total = BitrateBudget::total_bitrate(25_000, 10.0);
        // 204_800_000 / 10.73741824
        assert!((total - 19_073_486.328125).abs() < 1e-3);
    }

    #[test]
    fn test_sixty_seconds_clamps_audio_to_max() {
        let budget = BitrateBudget::for_target(25_000, 60.0, None).unwrap();
        assert!((budget.total_bps - 3_178_914.388).abs() < 0.01);
        assert_eq!(budget.audio_bps, MAX_AUDIO_BITRATE);
        assert!((budget.video_bps - (budget.total_bps - 256_000.0)).abs() < 1e-6);
    }

    #[test]
    fn test_source_audio_is_kept_when_it_fits() {
        let budget = BitrateBudget::for_target(25_000, 10.0, Some(128_000.0)).unwrap();
        assert_eq!(budget.audio_bps, 128_000.0);
        assert_eq!(budget.audio_arg(), 128_000);
        assert_eq!(budget.video_arg(), (budget.total_bps - 128_000.0).floor() as u64);
    }

    #[test]
    fn test_low_budget_raises_audio_to_min() {
        // total ~= 191 kbps, a tenth would be ~19 kbps
        let budget = BitrateBudget::for_target(25_000, 1000.0, None).unwrap();
        assert!(budget.total_bps > MIN_AUDIO_BITRATE);
        assert_eq!(budget.audio_bps, MIN_AUDIO_BITRATE);
    }

    #[test]
    fn test_tiny_budget_forces_audio_below_min() {
        let budget = BitrateBudget::for_target(1_000, 3000.0, None).unwrap();
        assert!(budget.total_bps < MIN_AUDIO_BITRATE);
        assert!((budget.audio_bps - budget.total_bps / 10.0).abs() < 1e-9);
        assert!(budget.video_bps > 0.0);
    }

    #[test]
    fn test_invalid_duration() {
        assert!(BitrateBudget::for_target(25_000, 0.0, None).is_err());
        assert!(BitrateBudget::for_target(25_000, f64::NAN, None).is_err());
    }
}
