//! Upload form normalization.
//!
//! Both adapters reduce their transport to an [`UploadForm`] (the raw
//! fields as sent) and then to a validated [`CompressionRequest`]. Field
//! checks run in a fixed order so both entry points report the same error
//! for the same bad form:
//!
//! 1. `compress_size` is an integer (default 70 when absent; a blank value
//!    counts as absent only under [`EmptyField::Absent`])
//! 2. an `image` field with non-empty bytes is present
//! 3. `compress_size` is within 60..=100
//! 4. filename present (when [`FilenamePolicy::Required`])
//! 5. filename extension is a supported upload format
//! 6. `return_url`, when sent, is a boolean

use crate::compress::{CompressError, CompressionResult, compress_with_backend};
use crate::imaging::{
    DEFAULT_QUALITY, ImageBackend, Quality, RustBackend, format_for_extension,
    supported_upload_extensions,
};
use crate::multipart::Part;
use image::ImageFormat;

pub const IMAGE_FIELD: &str = "image";
pub const QUALITY_FIELD: &str = "compress_size";
pub const RETURN_URL_FIELD: &str = "return_url";

/// A file field as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormUpload {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

/// The recognized form fields, unvalidated. Unknown fields are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    pub image: Option<FormUpload>,
    pub compress_size: Option<String>,
    pub return_url: Option<String>,
}

/// Whether the upload must carry a filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilenamePolicy {
    /// Reject uploads without a filename; always check the extension.
    Required,
    /// Accept anonymous uploads; check the extension only when named.
    Optional,
}

/// What a blank text field means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyField {
    /// Treat it as not sent.
    Absent,
    /// Validate it like any other value.
    Invalid,
}

/// Per-adapter form validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormRules {
    pub filename: FilenamePolicy,
    pub empty_quality: EmptyField,
}

impl FormRules {
    /// Browser forms: named uploads, blank `compress_size` falls back to 70.
    pub const HTTP: Self = Self {
        filename: FilenamePolicy::Required,
        empty_quality: EmptyField::Absent,
    };

    /// Event envelopes: anonymous uploads allowed, blank `compress_size` is
    /// not an integer.
    pub const EVENT: Self = Self {
        filename: FilenamePolicy::Optional,
        empty_quality: EmptyField::Invalid,
    };
}

impl UploadForm {
    /// Collect fields from parsed multipart parts.
    ///
    /// Only `form-data` parts with a name count. A repeated field keeps the
    /// last value.
    pub fn from_parts(parts: &[Part<'_>]) -> Self {
        let mut form = Self::default();
        for part in parts {
            let Some(disposition) = part.disposition().filter(|d| d.is_form_data()) else {
                continue;
            };
            let Some(name) = disposition.name else {
                continue;
            };
            form.set_field(&name, disposition.filename, part.body().to_vec());
        }
        form
    }

    /// Record one field. Text fields are decoded as lossy UTF-8.
    pub fn set_field(&mut self, name: &str, filename: Option<String>, bytes: Vec<u8>) {
        match name {
            IMAGE_FIELD => self.image = Some(FormUpload { filename, bytes }),
            QUALITY_FIELD => self.compress_size = Some(String::from_utf8_lossy(&bytes).into_owned()),
            RETURN_URL_FIELD => self.return_url = Some(String::from_utf8_lossy(&bytes).into_owned()),
            _ => {}
        }
    }

    pub fn into_request(self, rules: FormRules) -> Result<CompressionRequest, CompressError> {
        let compress_size = self.compress_size.as_deref().map(str::trim);
        let requested_quality = match (compress_size, rules.empty_quality) {
            (None, _) | (Some(""), EmptyField::Absent) => DEFAULT_QUALITY,
            (Some(text), _) => text
                .parse::<i64>()
                .map_err(|_| CompressError::validation("compress_size must be a valid integer"))?,
        };

        let upload = self
            .image
            .filter(|upload| !upload.bytes.is_empty())
            .ok_or_else(|| CompressError::validation("No image found in form-data"))?;

        Quality::new(requested_quality).map_err(|e| CompressError::Validation(e.to_string()))?;

        let filename = upload.filename.filter(|name| !name.is_empty());
        let format_hint = match (&filename, rules.filename) {
            (None, FilenamePolicy::Required) => {
                return Err(CompressError::validation("File must have a filename"));
            }
            (None, FilenamePolicy::Optional) => None,
            (Some(name), _) => Some(upload_format(name)?),
        };

        if let Some(text) = &self.return_url {
            parse_bool(text)
                .ok_or_else(|| CompressError::validation("return_url must be a boolean"))?;
        }

        Ok(CompressionRequest {
            raw_bytes: upload.bytes,
            requested_quality,
            filename,
            format_hint,
        })
    }
}

/// A validated upload, ready for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionRequest {
    pub raw_bytes: Vec<u8>,
    pub requested_quality: i64,
    pub filename: Option<String>,
    format_hint: Option<ImageFormat>,
}

impl CompressionRequest {
    pub fn compress(&self) -> Result<CompressionResult, CompressError> {
        self.compress_with_backend(&RustBackend::new())
    }

    pub fn compress_with_backend(
        &self,
        backend: &impl ImageBackend,
    ) -> Result<CompressionResult, CompressError> {
        compress_with_backend(backend, &self.raw_bytes, self.requested_quality, self.format_hint)
    }
}

/// Map a filename to its container format by extension.
fn upload_format(filename: &str) -> Result<ImageFormat, CompressError> {
    let extension = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    format_for_extension(extension).ok_or_else(|| {
        let supported: Vec<&str> = supported_upload_extensions().collect();
        CompressError::validation(format!(
            "File must be an image. Supported formats: {}",
            supported.join(", ")
        ))
    })
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
