//! Image processing: decode, downscale, JPEG encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (format guessed, extension as fallback) |
//! | **Normalize** | [`DecodedImage::normalize`] → RGB8 or L8 |
//! | **Resize** | Lanczos3 via `resize_exact` |
//! | **Encode** | `jpeg-encoder` with optimized Huffman tables |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for the size policy (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Policy → backend parameters

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ColorMode, DecodedImage, Dimensions, ImageBackend};
pub use calculations::{
    SizeThresholds, THRESHOLDS, compression_ratio_percent, effective_quality, fit_within_cap,
    max_dimension_for, needs_eager_decode,
};
pub use operations::{plan_encode, plan_resize};
pub use params::{
    DEFAULT_QUALITY, EncodeParams, QUALITY_RANGE, Quality, QualityOutOfRange, ResizeParams,
};
pub use rust_backend::{RustBackend, format_for_extension, supported_upload_extensions};
