//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the compression engine (which decides the policy) and
//! the [`backend`](super::backend) (which does the pixel work). Keeping them
//! plain data lets the engine run against a mock backend in tests.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG quality accepted from callers (60–100). Rejected, not clamped.
//! - [`ResizeParams`]: Exact output dimensions for a downscale.
//! - [`EncodeParams`]: Quality and entropy-coding options for the JPEG encoder.

use std::fmt;
use std::ops::RangeInclusive;

/// Range of qualities a caller may request.
pub const QUALITY_RANGE: RangeInclusive<i64> = 60..=100;

/// Quality used when the caller does not send one.
pub const DEFAULT_QUALITY: i64 = 70;

/// Lossy JPEG quality, guaranteed to be inside [`QUALITY_RANGE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(u8);

/// Returned by [`Quality::new`] for values outside [`QUALITY_RANGE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityOutOfRange(pub i64);

impl fmt::Display for QualityOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "compress_size must be between {} and {}",
            QUALITY_RANGE.start(),
            QUALITY_RANGE.end()
        )
    }
}

impl std::error::Error for QualityOutOfRange {}

impl Quality {
    pub fn new(value: i64) -> Result<Self, QualityOutOfRange> {
        if QUALITY_RANGE.contains(&value) {
            // In range, so it fits a u8.
            Ok(Self(value as u8))
        } else {
            Err(QualityOutOfRange(value))
        }
    }

    /// Lower the quality by `amount`, never going below the range floor.
    pub fn reduced_by(self, amount: u8) -> Self {
        let floor = *QUALITY_RANGE.start() as u8;
        Self(self.0.saturating_sub(amount).max(floor))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(DEFAULT_QUALITY as u8)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameters for a downscale to exact dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeParams {
    pub width: u32,
    pub height: u32,
}

/// Parameters for the JPEG encode step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub quality: Quality,
    /// Build per-image Huffman tables (smaller output, slower encode).
    pub optimize: bool,
}

impl EncodeParams {
    pub fn optimized(quality: Quality) -> Self {
        Self {
            quality,
            optimize: true,
        }
    }
}
