//! Human-readable formatting for sizes, ratios, and CLI summaries.
//!
//! # Output Format
//!
//! ## Compress
//!
//! ```text
//! photo.png → photo.jpg
//!     Size: 3.42 MB → 0.51 MB (85.1%)
//!     Dimensions: 4000x3000 → 1600x1200
//!     Quality: 80 (requested 90)
//!     Mode: RGB
//! ```
//!
//! # Architecture
//!
//! Each `format_*` function returns `Vec<String>` (or a `String`) for
//! testability; `print_*` wrappers write to stdout. The size and ratio
//! formatters are also used in log fields and error messages, so the
//! numbers a caller sees match the numbers in the logs.

use crate::compress::CompressionResult;
use std::path::Path;

const MIB: f64 = 1024.0 * 1024.0;

/// Bytes as mebibytes with two decimals: `"1.50 MB"`.
pub fn format_mb(bytes: usize) -> String {
    format!("{:.2} MB", bytes as f64 / MIB)
}

/// Compression ratio with one decimal and a percent sign: `"83.4%"`.
pub fn format_ratio(percent: f64) -> String {
    format!("{percent:.1}%")
}

/// Summary lines for one `compress` run.
pub fn format_compress_output(
    result: &CompressionResult,
    requested_quality: i64,
    input: &Path,
    output: &Path,
) -> Vec<String> {
    let mut lines = vec![format!("{} → {}", input.display(), output.display())];
    lines.push(format!(
        "    Size: {} → {} ({})",
        format_mb(result.original_size_bytes),
        format_mb(result.encoded_size_bytes),
        format_ratio(result.compression_ratio_percent)
    ));
    if result.was_resized() {
        lines.push(format!(
            "    Dimensions: {} → {}",
            result.original_dimensions, result.dimensions
        ));
    } else {
        lines.push(format!("    Dimensions: {}", result.dimensions));
    }
    let quality = result.effective_quality.value();
    if i64::from(quality) == requested_quality {
        lines.push(format!("    Quality: {quality}"));
    } else {
        lines.push(format!("    Quality: {quality} (requested {requested_quality})"));
    }
    lines.push(format!("    Mode: {}", result.color_mode));
    lines
}

pub fn print_compress_output(
    result: &CompressionResult,
    requested_quality: i64,
    input: &Path,
    output: &Path,
) {
    for line in format_compress_output(result, requested_quality, input, output) {
        println!("{}", line);
    }
}
