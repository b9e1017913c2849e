//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three pixel operations the
//! compression engine needs: decode, resize, and JPEG encode. Color-mode
//! normalization is not a backend operation; it is a fixed rule on
//! [`DecodedImage`] so every backend applies it identically.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::{EncodeParams, ResizeParams};
use image::{ColorType, DynamicImage, ImageFormat};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn longer_edge(self) -> u32 {
        self.width.max(self.height)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Color layout of a decoded image, as far as the JPEG encoder cares.
///
/// The encoder accepts exactly two layouts: 8-bit RGB and 8-bit grayscale.
/// Everything else (alpha channels, expanded palettes, 16-bit and float
/// buffers) is [`ColorMode::Other`] and must be converted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Rgb,
    Grayscale,
    Other,
}

impl ColorMode {
    pub fn of(color: ColorType) -> Self {
        match color {
            ColorType::Rgb8 => ColorMode::Rgb,
            ColorType::L8 => ColorMode::Grayscale,
            _ => ColorMode::Other,
        }
    }

    pub fn is_encodable(self) -> bool {
        !matches!(self, ColorMode::Other)
    }
}

impl std::fmt::Display for ColorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColorMode::Rgb => "RGB",
            ColorMode::Grayscale => "grayscale",
            ColorMode::Other => "other",
        };
        f.write_str(name)
    }
}

/// A fully decoded image, owned by the engine for a single request.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: DynamicImage,
}

impl DecodedImage {
    pub fn new(pixels: DynamicImage) -> Self {
        Self { pixels }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.pixels.width(),
            height: self.pixels.height(),
        }
    }

    pub fn color_mode(&self) -> ColorMode {
        ColorMode::of(self.pixels.color())
    }

    /// The raw color type reported by the decoder, for logging.
    pub fn color_type(&self) -> ColorType {
        self.pixels.color()
    }

    /// Convert to a layout the JPEG encoder accepts.
    ///
    /// RGB and 8-bit grayscale pass through untouched. Anything else becomes
    /// 8-bit RGB; alpha is discarded by `image`'s `to_rgb8` conversion.
    /// Returns `true` in the second slot when a conversion happened.
    pub fn normalize(self) -> (Self, bool) {
        if self.color_mode().is_encodable() {
            return (self, false);
        }
        let rgb = DynamicImage::ImageRgb8(self.pixels.to_rgb8());
        (Self::new(rgb), true)
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> DynamicImage {
        self.pixels
    }
}

/// Trait for image processing backends.
///
/// Implementations must be reentrant: the HTTP adapter calls one shared
/// backend from many blocking tasks at once.
pub trait ImageBackend: Sync {
    /// Decode a complete image from memory.
    ///
    /// `format_hint` is consulted only when the container cannot be
    /// identified from its leading bytes.
    fn decode(
        &self,
        raw: &[u8],
        format_hint: Option<ImageFormat>,
    ) -> Result<DecodedImage, BackendError>;

    /// Downscale to exact dimensions.
    fn resize(&self, image: DecodedImage, params: &ResizeParams) -> DecodedImage;

    /// Encode as baseline JPEG. The image must already be normalized.
    fn encode_jpeg(
        &self,
        image: &DecodedImage,
        params: &EncodeParams,
    ) -> Result<Vec<u8>, BackendError>;
}
