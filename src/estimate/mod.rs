//! Pure estimation rules for quality, bitrate and output size
//!
//! These functions are stateless; callers clamp the reduction percentage to
//! the supported range before calling.

use crate::error::{ShrinkError, ShrinkResult};

/// CRF anchor for visually lossless output at 0% requested reduction
pub const CRF_FLOOR: f64 = 23.0;
/// CRF span up to the practical ceiling (35) at 100% requested reduction
pub const CRF_SPAN: f64 = 12.0;
/// Fixed audio budget reserved out of the total bitrate
pub const AUDIO_BUDGET_KBPS: u32 = 128;
/// Lowest video bitrate allowed, to avoid degenerate encodes
pub const MIN_VIDEO_KBPS: u32 = 300;

/// Lowest supported reduction percentage
pub const MIN_REDUCTION: u8 = 5;
/// Highest supported reduction percentage
pub const MAX_REDUCTION: u8 = 80;

/// Map a requested reduction percentage onto a constant-quality parameter.
///
/// Linear: 23 at 0% reduction, 35 at 100%, rounded to nearest.
pub fn quality_for_reduction(reduction_percent: u8) -> u8 {
    let crf = CRF_FLOOR + (reduction_percent as f64 / 100.0) * CRF_SPAN;
    crf.round() as u8
}

/// Compute the video bitrate that hits a target file size over a duration.
///
/// Reserves [`AUDIO_BUDGET_KBPS`] for audio and floors the result at
/// [`MIN_VIDEO_KBPS`]. A non-positive duration is an error, never a silent
/// division.
pub fn bitrate_kbps(target_size_mb: f64, duration_seconds: f64) -> ShrinkResult<u32> {
    if duration_seconds <= 0.0 {
        return Err(ShrinkError::InvalidDuration {
            seconds: duration_seconds,
        });
    }
    let total_kbps = (target_size_mb * 8192.0) / duration_seconds;
    let video_kbps = (total_kbps as i64 - AUDIO_BUDGET_KBPS as i64).max(MIN_VIDEO_KBPS as i64);
    Ok(video_kbps as u32)
}

/// Naive linear output-size preview: `input * (1 - reduction/100)`.
///
/// This is an approximation unrelated to actual rate-control behavior and
/// is presented to users as such, never as a guarantee.
pub fn estimated_output_bytes(input_bytes: u64, reduction_percent: u8) -> u64 {
    (input_bytes as f64 * (1.0 - reduction_percent as f64 / 100.0)) as u64
}

/// Clamp a requested reduction into the supported range.
pub fn clamp_reduction(reduction_percent: u8) -> u8 {
    reduction_percent.clamp(MIN_REDUCTION, MAX_REDUCTION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShrinkError;

    #[test]
    fn quality_anchors() {
        assert_eq!(quality_for_reduction(0), 23);
        assert_eq!(quality_for_reduction(100), 35);
    }

    #[test]
    fn quality_rounds_to_nearest() {
        // 23 + 0.20 * 12 = 25.4
        assert_eq!(quality_for_reduction(20), 25);
        // 23 + 0.55 * 12 = 29.6
        assert_eq!(quality_for_reduction(55), 30);
    }

    #[test]
    fn quality_is_monotone() {
        let mut last = 0;
        for reduction in 0..=100 {
            let crf = quality_for_reduction(reduction);
            assert!(crf >= last, "CRF dropped at {}%", reduction);
            last = crf;
        }
    }

    #[test]
    fn bitrate_never_below_floor() {
        for &(target, duration) in &[(0.1, 600.0), (1.0, 60.0), (100.0, 60.0), (0.01, 3600.0)] {
            let kbps = bitrate_kbps(target, duration).unwrap();
            assert!(kbps >= MIN_VIDEO_KBPS, "{}kbps for {}MB/{}s", kbps, target, duration);
        }
    }

    #[test]
    fn bitrate_reserves_audio_budget() {
        // 50MB over 60s: 50*8192/60 = 6826.67 total, minus 128 audio
        let kbps = bitrate_kbps(50.0, 60.0).unwrap();
        assert_eq!(kbps, 6698);
    }

    #[test]
    fn bitrate_rejects_non_positive_duration() {
        assert!(matches!(
            bitrate_kbps(10.0, 0.0),
            Err(ShrinkError::InvalidDuration { .. })
        ));
        assert!(matches!(
            bitrate_kbps(10.0, -5.0),
            Err(ShrinkError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn size_preview_endpoints() {
        assert_eq!(estimated_output_bytes(1_000_000, 0), 1_000_000);
        assert_eq!(estimated_output_bytes(1_000_000, 100), 0);
        assert_eq!(estimated_output_bytes(1_000_000, 25), 750_000);
    }

    #[test]
    fn reduction_clamping() {
        assert_eq!(clamp_reduction(0), MIN_REDUCTION);
        assert_eq!(clamp_reduction(42), 42);
        assert_eq!(clamp_reduction(100), MAX_REDUCTION);
    }
}
