//! The compression policy engine.
//!
//! One pure function from `(raw image bytes, requested quality)` to
//! `(JPEG bytes, metrics)`, shared by the HTTP and event adapters:
//!
//! ```text
//! validate → decode → normalize color → resize to cap → pick quality → encode → metrics
//! ```
//!
//! ## Size Policy
//!
//! Every decision keys off the upload's compressed byte size:
//!
//! ```text
//! > 1 MiB   longer edge capped at 1600px (else 2048px)
//! > 2 MiB   logged as large; decoded in full before anything else runs
//! > 3 MiB   quality lowered by 10, never below 60
//! ```
//!
//! The engine performs no I/O and holds no state between calls. It is
//! CPU-bound and blocking; async callers should run it on a blocking pool.
//! It emits `tracing` events along the way, and nothing it returns depends
//! on a subscriber being installed.

use crate::imaging::{
    BackendError, ColorMode, Dimensions, ImageBackend, Quality, RustBackend, SizeThresholds,
    THRESHOLDS, compression_ratio_percent, needs_eager_decode, plan_encode, plan_resize,
};
use crate::output::{format_mb, format_ratio};
use image::ImageFormat;
use thiserror::Error;
use tracing::{debug, info};

/// Why a request could not be compressed.
///
/// Each variant carries the message shown to the caller.
#[derive(Error, Debug)]
pub enum CompressError {
    /// Bad input the caller can fix: quality, missing fields, extension.
    #[error("{0}")]
    Validation(String),
    /// Bytes that do not form a supported image.
    #[error("{0}")]
    Decode(String),
    /// Request or result over a transport size ceiling.
    #[error("{0}")]
    PayloadTooLarge(String),
    /// The encoder rejected the buffer.
    #[error("Error compressing image: {0}")]
    Encode(String),
    /// Anything else that went wrong on our side.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl CompressError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// HTTP status (or event `statusCode`) for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::Decode(_) => 400,
            Self::PayloadTooLarge(_) => 413,
            Self::Encode(_) | Self::Internal(_) => 500,
        }
    }

    /// Message safe to return to the caller.
    ///
    /// Server-side failures collapse to a generic description; the detail
    /// stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::Decode(msg) | Self::PayloadTooLarge(msg) => msg.clone(),
            Self::Encode(_) => "Error compressing image".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

impl From<BackendError> for CompressError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Decode(detail) => {
                debug!(%detail, "decode failed");
                Self::Decode(DECODE_FAILED.to_string())
            }
            BackendError::Encode(detail) => Self::Encode(detail),
        }
    }
}

const DECODE_FAILED: &str = "Invalid or corrupted image file";

/// A compressed image plus the numbers reported back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionResult {
    pub encoded_bytes: Vec<u8>,
    pub original_size_bytes: usize,
    pub encoded_size_bytes: usize,
    pub effective_quality: Quality,
    /// `(1 - encoded/original) * 100`; negative when the output grew.
    pub compression_ratio_percent: f64,
    pub original_dimensions: Dimensions,
    pub dimensions: Dimensions,
    pub color_mode: ColorMode,
}

impl CompressionResult {
    pub fn was_resized(&self) -> bool {
        self.original_dimensions != self.dimensions
    }
}

/// Compress with the production backend.
pub fn compress(raw_bytes: &[u8], requested_quality: i64) -> Result<CompressionResult, CompressError> {
    compress_with_backend(&RustBackend::new(), raw_bytes, requested_quality, None)
}

/// Compress using a specific backend (allows testing with mock).
///
/// `format_hint` comes from the upload's filename and is only used when the
/// container cannot be identified from its bytes.
pub fn compress_with_backend(
    backend: &impl ImageBackend,
    raw_bytes: &[u8],
    requested_quality: i64,
    format_hint: Option<ImageFormat>,
) -> Result<CompressionResult, CompressError> {
    compress_with_thresholds(backend, &THRESHOLDS, raw_bytes, requested_quality, format_hint)
}

fn compress_with_thresholds(
    backend: &impl ImageBackend,
    thresholds: &SizeThresholds,
    raw_bytes: &[u8],
    requested_quality: i64,
    format_hint: Option<ImageFormat>,
) -> Result<CompressionResult, CompressError> {
    let requested = Quality::new(requested_quality)
        .map_err(|e| CompressError::Validation(e.to_string()))?;
    if raw_bytes.is_empty() {
        return Err(CompressError::validation("Image data is empty"));
    }
    let raw_len = raw_bytes.len();

    if needs_eager_decode(thresholds, raw_len) {
        info!(size = %format_mb(raw_len), "large image detected, decoding in full");
    }
    let decoded = backend.decode(raw_bytes, format_hint)?;
    let original_dimensions = decoded.dimensions();
    info!(
        color = ?decoded.color_type(),
        dimensions = %original_dimensions,
        size = %format_mb(raw_len),
        "image opened"
    );

    let (image, converted) = decoded.normalize();
    if converted {
        info!("converted image to RGB mode");
    } else if image.color_mode() == ColorMode::Grayscale {
        debug!("keeping grayscale mode");
    }

    let image = match plan_resize(thresholds, raw_len, original_dimensions) {
        Some(params) => {
            info!(from = %original_dimensions, width = params.width, height = params.height, "resizing");
            backend.resize(image, &params)
        }
        None => image,
    };

    let encode = plan_encode(thresholds, raw_len, requested);
    if encode.quality != requested {
        info!(
            requested = requested.value(),
            effective = encode.quality.value(),
            "very large image, reducing quality"
        );
    }
    let encoded_bytes = backend.encode_jpeg(&image, &encode)?;

    let encoded_size_bytes = encoded_bytes.len();
    let ratio = compression_ratio_percent(raw_len, encoded_size_bytes);
    info!(
        original = %format_mb(raw_len),
        compressed = %format_mb(encoded_size_bytes),
        ratio = %format_ratio(ratio),
        quality = encode.quality.value(),
        "compression complete"
    );

    Ok(CompressionResult {
        encoded_bytes,
        original_size_bytes: raw_len,
        encoded_size_bytes,
        effective_quality: encode.quality,
        compression_ratio_percent: ratio,
        original_dimensions,
        dimensions: image.dimensions(),
        color_mode: image.color_mode(),
    })
}
