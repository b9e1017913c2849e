//! Pure calculation functions for the compression policy.
//!
//! All functions here are pure and testable without any I/O or images.
//! Every size decision is driven by the *compressed* byte size of the
//! upload, not by its pixel count.

use super::params::Quality;

const MIB: usize = 1024 * 1024;

/// Byte-size breakpoints and the policy attached to each.
///
/// Fixed at build time; see [`THRESHOLDS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeThresholds {
    /// Inputs above this are logged as large and decoded up front.
    pub eager_decode_bytes: usize,
    /// Inputs above this get the tighter dimension cap.
    pub large_input_bytes: usize,
    /// Max dimension for inputs above `large_input_bytes`.
    pub large_input_cap: u32,
    /// Max dimension for everything else.
    pub standard_cap: u32,
    /// Inputs above this get their quality lowered.
    pub quality_reduction_bytes: usize,
    /// How far to lower the quality for those inputs.
    pub quality_reduction: u8,
}

pub const THRESHOLDS: SizeThresholds = SizeThresholds {
    eager_decode_bytes: 2 * MIB,
    large_input_bytes: MIB,
    large_input_cap: 1600,
    standard_cap: 2048,
    quality_reduction_bytes: 3 * MIB,
    quality_reduction: 10,
};

/// Pick the max-dimension cap from the upload's byte size.
///
/// # Examples
/// ```
/// # use img_squeeze::imaging::{THRESHOLDS, max_dimension_for};
/// assert_eq!(max_dimension_for(&THRESHOLDS, 500 * 1024), 2048);
/// assert_eq!(max_dimension_for(&THRESHOLDS, 2 * 1024 * 1024), 1600);
/// ```
pub fn max_dimension_for(thresholds: &SizeThresholds, raw_len: usize) -> u32 {
    if raw_len > thresholds.large_input_bytes {
        thresholds.large_input_cap
    } else {
        thresholds.standard_cap
    }
}

/// Whether the decode step is on the large-input path.
pub fn needs_eager_decode(thresholds: &SizeThresholds, raw_len: usize) -> bool {
    raw_len > thresholds.eager_decode_bytes
}

/// Calculate downscaled dimensions so the longer edge equals `cap`.
///
/// Returns `None` when the image already fits (images are never upscaled).
/// The shorter edge is `round(minor * cap / major)`, at least 1 px. Square
/// images take the portrait branch, so both edges become `cap`.
///
/// # Arguments
/// * `source` - Decoded dimensions (width, height)
/// * `cap` - Maximum allowed extent for either edge
pub fn fit_within_cap(source: (u32, u32), cap: u32) -> Option<(u32, u32)> {
    let (w, h) = source;
    if w <= cap && h <= cap {
        return None;
    }

    let scale = |minor: u32, major: u32| -> u32 {
        let scaled = (minor as f64 * cap as f64 / major as f64).round() as u32;
        scaled.max(1)
    };

    if w > h {
        Some((cap, scale(h, w)))
    } else {
        Some((scale(w, h), cap))
    }
}

/// Quality actually used for encoding, after the large-input reduction.
pub fn effective_quality(thresholds: &SizeThresholds, raw_len: usize, requested: Quality) -> Quality {
    if raw_len > thresholds.quality_reduction_bytes {
        requested.reduced_by(thresholds.quality_reduction)
    } else {
        requested
    }
}

/// Percentage reduction from `original` to `encoded` bytes.
///
/// Negative when the output grew. `original` of zero yields 0.0; the engine
/// rejects empty input before this is reached.
pub fn compression_ratio_percent(original: usize, encoded: usize) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (1.0 - encoded as f64 / original as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // max_dimension_for
    // =========================================================================

    #[test]
    fn cap_is_standard_at_exactly_one_mib() {
        assert_eq!(max_dimension_for(&THRESHOLDS, MIB), 2048);
    }

    #[test]
    fn cap_tightens_above_one_mib() {
        assert_eq!(max_dimension_for(&THRESHOLDS, MIB + 1), 1600);
    }

    #[test]
    fn eager_decode_boundary() {
        assert!(!needs_eager_decode(&THRESHOLDS, 2 * MIB));
        assert!(needs_eager_decode(&THRESHOLDS, 2 * MIB + 1));
    }

    // =========================================================================
    // fit_within_cap
    // =========================================================================

    #[test]
    fn fit_leaves_small_images_alone() {
        assert_eq!(fit_within_cap((500, 500), 2048), None);
        assert_eq!(fit_within_cap((2048, 1000), 2048), None);
    }

    #[test]
    fn fit_landscape() {
        // 4000x3000 at cap 1600 → 1600x1200
        assert_eq!(fit_within_cap((4000, 3000), 1600), Some((1600, 1200)));
    }

    #[test]
    fn fit_portrait() {
        assert_eq!(fit_within_cap((3000, 4000), 1600), Some((1200, 1600)));
    }

    #[test]
    fn fit_square() {
        assert_eq!(fit_within_cap((3000, 3000), 2048), Some((2048, 2048)));
    }

    #[test]
    fn fit_rounds_to_nearest() {
        // 1000 * 2048 / 3000 = 682.67 → 683
        assert_eq!(fit_within_cap((3000, 1000), 2048), Some((2048, 683)));
        // 999 * 1600 / 2001 = 798.8 → 799
        assert_eq!(fit_within_cap((999, 2001), 1600), Some((799, 1600)));
    }

    #[test]
    fn fit_extreme_strip_keeps_one_pixel() {
        assert_eq!(fit_within_cap((10000, 2), 1600), Some((1600, 1)));
        assert_eq!(fit_within_cap((1, 9000), 2048), Some((1, 2048)));
    }

    #[test]
    fn fit_only_one_edge_over_cap() {
        // Height alone exceeds the cap
        assert_eq!(fit_within_cap((1000, 2500), 2048), Some((819, 2048)));
    }

    #[test]
    fn fit_preserves_aspect_within_one_pixel() {
        for &(w, h) in &[(4032, 3024), (5000, 2813), (1601, 1599), (7000, 123)] {
            let (nw, nh) = fit_within_cap((w, h), 1600).unwrap();
            assert_eq!(nw.max(nh), 1600);
            let exact = h as f64 * nw as f64 / w as f64;
            assert!((nh as f64 - exact).abs() <= 1.0, "{w}x{h} → {nw}x{nh}");
        }
    }

    // =========================================================================
    // effective_quality
    // =========================================================================

    #[test]
    fn quality_unchanged_at_three_mib() {
        let q = Quality::new(90).unwrap();
        assert_eq!(effective_quality(&THRESHOLDS, 3 * MIB, q).value(), 90);
    }

    #[test]
    fn quality_reduced_above_three_mib() {
        let q = Quality::new(90).unwrap();
        assert_eq!(effective_quality(&THRESHOLDS, 3 * MIB + 1, q).value(), 80);
    }

    #[test]
    fn quality_reduction_floors_at_60() {
        let q = Quality::new(64).unwrap();
        assert_eq!(effective_quality(&THRESHOLDS, 4 * MIB, q).value(), 60);
    }

    // =========================================================================
    // compression_ratio_percent
    // =========================================================================

    #[test]
    fn ratio_positive_when_smaller() {
        assert!((compression_ratio_percent(1000, 250) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn ratio_negative_when_larger() {
        assert!((compression_ratio_percent(100, 150) + 50.0).abs() < 1e-9);
    }

    #[test]
    fn ratio_zero_original() {
        assert_eq!(compression_ratio_percent(0, 10), 0.0);
    }
}
