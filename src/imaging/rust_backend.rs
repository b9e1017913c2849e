//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, BMP, GIF, TIFF, WebP, TGA, ICO) | `image::ImageReader` with guessed format |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `jpeg_encoder::Encoder` with optimized Huffman tables |
//!
//! Decoding always materializes the full pixel buffer; there is no lazy
//! decode path for a later step to trip over.

use super::backend::{BackendError, DecodedImage, ImageBackend};
use super::params::{EncodeParams, ResizeParams};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

/// Upload extensions accepted by the adapters, with the decoder each maps to.
const UPLOAD_FORMATS: &[(&str, ImageFormat)] = &[
    ("bmp", ImageFormat::Bmp),
    ("gif", ImageFormat::Gif),
    ("ico", ImageFormat::Ico),
    ("jpeg", ImageFormat::Jpeg),
    ("jpg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tga", ImageFormat::Tga),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

/// Accepted upload extensions, sorted.
pub fn supported_upload_extensions() -> impl Iterator<Item = &'static str> {
    UPLOAD_FORMATS.iter().map(|(ext, _)| *ext)
}

/// Map a (case-insensitive) extension to its decoder, if it is accepted.
pub fn format_for_extension(ext: &str) -> Option<ImageFormat> {
    UPLOAD_FORMATS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, fmt)| *fmt)
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn decode(
        &self,
        raw: &[u8],
        format_hint: Option<ImageFormat>,
    ) -> Result<DecodedImage, BackendError> {
        let reader = ImageReader::new(Cursor::new(raw))
            .with_guessed_format()
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        match (reader.format(), format_hint) {
            (Some(guessed), Some(hint)) if guessed != hint => {
                // TGA has no signature, so its first bytes can pass for another
                // container. The extension gets a second chance.
                reader
                    .decode()
                    .or_else(|_| decode_as(raw, hint))
                    .map(DecodedImage::new)
                    .map_err(|e| BackendError::Decode(e.to_string()))
            }
            (Some(_), _) => reader
                .decode()
                .map(DecodedImage::new)
                .map_err(|e| BackendError::Decode(e.to_string())),
            (None, Some(hint)) => decode_as(raw, hint)
                .map(DecodedImage::new)
                .map_err(|e| BackendError::Decode(e.to_string())),
            (None, None) => Err(BackendError::Decode(
                "unrecognized image container".to_string(),
            )),
        }
    }

    fn resize(&self, image: DecodedImage, params: &ResizeParams) -> DecodedImage {
        let resized =
            image
                .into_pixels()
                .resize_exact(params.width, params.height, FilterType::Lanczos3);
        DecodedImage::new(resized)
    }

    fn encode_jpeg(
        &self,
        image: &DecodedImage,
        params: &EncodeParams,
    ) -> Result<Vec<u8>, BackendError> {
        let dims = image.dimensions();
        let width = u16::try_from(dims.width)
            .map_err(|_| BackendError::Encode(format!("width {} exceeds JPEG limit", dims.width)))?;
        let height = u16::try_from(dims.height).map_err(|_| {
            BackendError::Encode(format!("height {} exceeds JPEG limit", dims.height))
        })?;

        let (raw, color) = match image.pixels() {
            DynamicImage::ImageRgb8(buf) => (buf.as_raw(), jpeg_encoder::ColorType::Rgb),
            DynamicImage::ImageLuma8(buf) => (buf.as_raw(), jpeg_encoder::ColorType::Luma),
            other => {
                return Err(BackendError::Encode(format!(
                    "JPEG needs RGB or grayscale input, got {:?}",
                    other.color()
                )));
            }
        };

        let mut out = Vec::new();
        let mut encoder = jpeg_encoder::Encoder::new(&mut out, params.quality.value());
        encoder.set_optimized_huffman_tables(params.optimize);
        encoder
            .encode(raw, width, height, color)
            .map_err(|e| BackendError::Encode(e.to_string()))?;
        Ok(out)
    }
}

fn decode_as(raw: &[u8], format: ImageFormat) -> image::ImageResult<DynamicImage> {
    let mut reader = ImageReader::new(Cursor::new(raw));
    reader.set_format(format);
    reader.decode()
}
