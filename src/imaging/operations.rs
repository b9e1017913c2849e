//! High-level image operations.
//!
//! These functions turn the size policy in [`calculations`](super::calculations)
//! into backend parameters. Planning is separate from execution so the
//! decisions can be tested without pixels.

use super::backend::Dimensions;
use super::calculations::{SizeThresholds, effective_quality, fit_within_cap, max_dimension_for};
use super::params::{EncodeParams, Quality, ResizeParams};

/// Plan the downscale for an upload of `raw_len` bytes, if one is needed.
pub fn plan_resize(
    thresholds: &SizeThresholds,
    raw_len: usize,
    source: Dimensions,
) -> Option<ResizeParams> {
    let cap = max_dimension_for(thresholds, raw_len);
    fit_within_cap((source.width, source.height), cap)
        .map(|(width, height)| ResizeParams { width, height })
}

/// Plan the encode step for an upload of `raw_len` bytes.
pub fn plan_encode(thresholds: &SizeThresholds, raw_len: usize, requested: Quality) -> EncodeParams {
    EncodeParams::optimized(effective_quality(thresholds, raw_len, requested))
}
