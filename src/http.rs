//! HTTP adapter.
//!
//! ## Routes
//!
//! | Route | Method | Response |
//! |---|---|---|
//! | `/` | GET | service banner JSON |
//! | `/health` | GET | health JSON |
//! | `/compress` | POST, GET | JPEG bytes + metric headers |
//! | `/compress-url` | POST | same as `/compress`; accepts a `return_url` flag |
//!
//! Uploads are `multipart/form-data` with an `image` file field (filename
//! required) and an optional integer `compress_size` (default 70). Errors are
//! JSON `{"detail": "..."}`.
//!
//! The engine is CPU-bound, so each request runs it on tokio's blocking
//! pool and the async workers only move bytes.

use crate::compress::{CompressError, CompressionResult};
use crate::config::ServerConfig;
use crate::form::{FormRules, UploadForm};
use crate::output::format_ratio;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart};
use axum::http::{HeaderName, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const X_ORIGINAL_SIZE: HeaderName = HeaderName::from_static("x-original-size");
const X_COMPRESSED_SIZE: HeaderName = HeaderName::from_static("x-compressed-size");
const X_COMPRESSION_RATIO: HeaderName = HeaderName::from_static("x-compression-ratio");
const X_COMPRESSION_QUALITY: HeaderName = HeaderName::from_static("x-compression-quality");

/// Build the application router.
pub fn router(config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/compress", get(compress_handler).post(compress_handler))
        .route("/compress-url", post(compress_url_handler))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.bind).await?;
    info!(addr = %listener.local_addr()?, "HTTP adapter listening");

    axum::serve(listener, router(config).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

async fn root_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Image Compression API",
        "status": "running"
    }))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "image-compression"
    }))
}

async fn compress_handler(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, CompressError> {
    let mut form = read_form(multipart?).await?;
    // Only /compress-url knows the flag
    form.return_url = None;
    compress_form(form).await
}

async fn compress_url_handler(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, CompressError> {
    let form = read_form(multipart?).await?;
    compress_form(form).await
}

async fn compress_form(form: UploadForm) -> Result<Response, CompressError> {
    let request = form.into_request(FormRules::HTTP)?;
    info!(
        filename = request.filename.as_deref().unwrap_or_default(),
        bytes = request.raw_bytes.len(),
        quality = request.requested_quality,
        "processing image"
    );

    let result = tokio::task::spawn_blocking(move || request.compress())
        .await
        .map_err(|e| CompressError::Internal(e.to_string()))??;
    Ok(jpeg_response(result))
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, CompressError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(field_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let filename = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(field_error)?;
        form.set_field(&name, filename, bytes.to_vec());
    }
    Ok(form)
}

fn field_error(err: MultipartError) -> CompressError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        CompressError::PayloadTooLarge("Request body too large".to_string())
    } else {
        warn!(error = %err.body_text(), "multipart read failed");
        CompressError::validation("Invalid multipart form data")
    }
}

fn jpeg_response(result: CompressionResult) -> Response {
    let headers = [
        (header::CONTENT_TYPE, "image/jpeg".to_string()),
        (header::CONTENT_LENGTH, result.encoded_size_bytes.to_string()),
        (X_ORIGINAL_SIZE, result.original_size_bytes.to_string()),
        (X_COMPRESSED_SIZE, result.encoded_size_bytes.to_string()),
        (X_COMPRESSION_RATIO, format_ratio(result.compression_ratio_percent)),
        (X_COMPRESSION_QUALITY, result.effective_quality.to_string()),
    ];
    (StatusCode::OK, headers, result.encoded_bytes).into_response()
}

impl From<MultipartRejection> for CompressError {
    fn from(rejection: MultipartRejection) -> Self {
        warn!(error = %rejection.body_text(), "request is not multipart");
        CompressError::validation("Invalid multipart form data")
    }
}

impl IntoResponse for CompressError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        (
            status,
            Json(serde_json::json!({ "detail": self.public_message() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MultipartBuilder, encode_as, gradient_rgb};
    use axum::body::Body;
    use axum::http::Request;
    use image::{DynamicImage, ImageFormat};
    use tower::ServiceExt;

    fn app() -> Router {
        router(&ServerConfig::default())
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        encode_as(&DynamicImage::ImageRgb8(gradient_rgb(width, height)), ImageFormat::Png)
    }

    fn upload(method: &str, uri: &str, builder: MultipartBuilder) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", builder.content_type())
            .body(Body::from(builder.build()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn detail(response: Response) -> String {
        json_body(response).await["detail"].as_str().unwrap().to_string()
    }

    fn header_str<'a>(response: &'a Response, name: &str) -> &'a str {
        response.headers()[name].to_str().unwrap()
    }

    // =========================================================================
    // Info routes
    // =========================================================================

    #[tokio::test]
    async fn root_banner() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["message"], "Image Compression API");
        assert_eq!(json["status"], "running");
    }

    #[tokio::test]
    async fn health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "image-compression");
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let request = Request::builder()
            .uri("/health")
            .header("origin", "https://example.com")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(header_str(&response, "access-control-allow-origin"), "*");
    }

    // =========================================================================
    // /compress
    // =========================================================================

    #[tokio::test]
    async fn compress_returns_jpeg_with_metric_headers() {
        let original = png(200, 150);
        let builder = MultipartBuilder::new("B")
            .file("image", "photo.png", &original)
            .text("compress_size", "85");
        let response = app().oneshot(upload("POST", "/compress", builder)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, "content-type"), "image/jpeg");
        assert_eq!(
            header_str(&response, "x-original-size"),
            original.len().to_string()
        );
        assert_eq!(header_str(&response, "x-compression-quality"), "85");
        assert!(header_str(&response, "x-compression-ratio").ends_with('%'));
        let compressed_size: usize = header_str(&response, "x-compressed-size").parse().unwrap();
        let content_length: usize = header_str(&response, "content-length").parse().unwrap();
        assert_eq!(compressed_size, content_length);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body.len(), compressed_size);
        let back = image::load_from_memory(&body).unwrap();
        assert_eq!((back.width(), back.height()), (200, 150));
    }

    #[tokio::test]
    async fn compress_defaults_quality_to_70() {
        let builder = MultipartBuilder::new("B").file("image", "a.png", &png(32, 32));
        let response = app().oneshot(upload("POST", "/compress", builder)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, "x-compression-quality"), "70");
    }

    #[tokio::test]
    async fn blank_compress_size_uses_default() {
        let builder = MultipartBuilder::new("B")
            .file("image", "a.png", &png(32, 32))
            .text("compress_size", "");
        let response = app().oneshot(upload("POST", "/compress", builder)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, "x-compression-quality"), "70");
    }

    #[tokio::test]
    async fn compress_accepts_get() {
        let builder = MultipartBuilder::new("B").file("image", "a.png", &png(16, 16));
        let response = app().oneshot(upload("GET", "/compress", builder)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn compress_ignores_return_url() {
        let builder = MultipartBuilder::new("B")
            .file("image", "a.png", &png(16, 16))
            .text("return_url", "not-a-bool");
        let response = app().oneshot(upload("POST", "/compress", builder)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn quality_out_of_range() {
        let builder = MultipartBuilder::new("B")
            .file("image", "a.png", &png(16, 16))
            .text("compress_size", "101");
        let response = app().oneshot(upload("POST", "/compress", builder)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(detail(response).await, "compress_size must be between 60 and 100");
    }

    #[tokio::test]
    async fn missing_filename() {
        let body = b"--B\r\nContent-Disposition: form-data; name=\"image\"\r\n\r\nxyz\r\n--B--\r\n";
        let request = Request::builder()
            .method("POST")
            .uri("/compress")
            .header("content-type", "multipart/form-data; boundary=B")
            .body(Body::from(body.to_vec()))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(detail(response).await, "File must have a filename");
    }

    #[tokio::test]
    async fn unsupported_extension() {
        let builder = MultipartBuilder::new("B").file("image", "notes.txt", b"hello");
        let response = app().oneshot(upload("POST", "/compress", builder)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(detail(response).await.starts_with("File must be an image. Supported formats:"));
    }

    #[tokio::test]
    async fn corrupted_image() {
        let builder = MultipartBuilder::new("B").file("image", "a.jpg", b"not really a jpeg");
        let response = app().oneshot(upload("POST", "/compress", builder)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(detail(response).await, "Invalid or corrupted image file");
    }

    #[tokio::test]
    async fn missing_image_field() {
        let builder = MultipartBuilder::new("B").text("compress_size", "80");
        let response = app().oneshot(upload("POST", "/compress", builder)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(detail(response).await, "No image found in form-data");
    }

    #[tokio::test]
    async fn non_multipart_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/compress")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(detail(response).await, "Invalid multipart form data");
    }

    #[tokio::test]
    async fn body_over_limit_is_413() {
        let config = ServerConfig {
            max_body_bytes: 1024,
            ..ServerConfig::default()
        };
        let builder = MultipartBuilder::new("B").file("image", "big.png", &vec![7u8; 64 * 1024]);
        let response = router(&config)
            .oneshot(upload("POST", "/compress", builder))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(detail(response).await, "Request body too large");
    }

    // =========================================================================
    // /compress-url
    // =========================================================================

    #[tokio::test]
    async fn compress_url_matches_compress() {
        let builder = MultipartBuilder::new("B")
            .file("image", "a.png", &png(40, 30))
            .text("compress_size", "90")
            .text("return_url", "true");
        let response = app()
            .oneshot(upload("POST", "/compress-url", builder))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, "content-type"), "image/jpeg");
        assert_eq!(header_str(&response, "x-compression-quality"), "90");
    }

    #[tokio::test]
    async fn compress_url_rejects_non_boolean_flag() {
        let builder = MultipartBuilder::new("B")
            .file("image", "a.png", &png(8, 8))
            .text("return_url", "sometimes");
        let response = app()
            .oneshot(upload("POST", "/compress-url", builder))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(detail(response).await, "return_url must be a boolean");
    }

    // =========================================================================
    // Error mapping
    // =========================================================================

    #[tokio::test]
    async fn server_error_detail_is_generic() {
        let response = CompressError::Encode("buffer mismatch".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(detail(response).await, "Error compressing image");
    }
}
