//! # img-squeeze
//!
//! Size-aware JPEG compression for uploaded images. A caller sends an image
//! and a quality level; the service sends back a JPEG whose dimensions and
//! quality have been bounded according to how large the upload was.
//!
//! # Architecture: One Engine, Two Entry Points
//!
//! ```text
//! HTTP multipart  ──┐
//!                   ├─→  UploadForm  →  CompressionRequest  →  engine  →  JPEG + metrics
//! Event envelope  ──┘
//! ```
//!
//! Both adapters reduce their transport to the same form and call the same
//! engine, so a given image and quality produce byte-identical output no
//! matter how it arrived. Transport-specific rules (response envelopes,
//! payload ceilings, error body shape) stay in the adapters.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`compress`] | The engine: validate, decode, normalize, resize, encode, measure |
//! | [`imaging`] | Size policy calculations, backend trait, `image`/`jpeg-encoder` backend |
//! | [`form`] | Form fields → validated [`form::CompressionRequest`] |
//! | [`multipart`] | `multipart/form-data` decoder for the event adapter |
//! | [`http`] | axum router: `/`, `/health`, `/compress`, `/compress-url` |
//! | [`event`] | Serverless handler: base64 multipart in, base64 JPEG out |
//! | [`config`] | `config.toml` loading, validation, merging |
//! | [`output`] | Size/ratio formatting shared by logs, errors, and the CLI |
//!
//! # Design Decisions
//!
//! ## The Upload Size Drives Everything
//!
//! Resize caps and quality reductions key off the upload's *byte* size, not
//! its pixel count. A large file is the signal that the caller's bandwidth
//! and the response ceiling are at risk, so large files get a tighter
//! dimension cap and, past 3 MiB, a lower quality. The thresholds are
//! constants in [`imaging::THRESHOLDS`]; they are not configuration.
//!
//! ## JPEG Only, Two Color Modes
//!
//! Output is always baseline JPEG with optimized Huffman tables. JPEG stores
//! RGB or grayscale, so every decoded image is normalized into one of those
//! two before encoding ([`imaging::ColorMode`]). Alpha is dropped, not
//! composited.
//!
//! ## Blocking Work Off the Async Runtime
//!
//! Decoding and encoding are CPU-bound. The engine is a plain synchronous
//! function; the HTTP adapter runs it with `tokio::task::spawn_blocking` so
//! slow images never stall other connections.
//!
//! ## Errors Carry Their Status
//!
//! [`compress::CompressError`] knows its HTTP status and which message is
//! safe to show. Each adapter only decides the body shape:
//! `{"detail": ...}` for HTTP, `{"error": ...}` for events.

pub mod compress;
pub mod config;
pub mod event;
pub mod form;
pub mod http;
pub mod imaging;
pub mod multipart;
pub mod output;

#[cfg(test)]
pub(crate) mod test_helpers;
