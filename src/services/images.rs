//! Image loading and normalization
//!
//! Every image sent to a model is first decoded, forced to RGB8 and
//! re-encoded as JPEG at a fixed quality, so the model always sees one format.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use reqwest::Client as HttpClient;
use std::{
    io::Cursor,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::error::{AppError, AppResult};

/// Default cap on a remote image body
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Source of raw image bytes for a reference (URL, data URI or file path)
#[async_trait::async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fails with `AppError::ImageFetchFailure` when the bytes cannot be obtained
    async fn fetch(&self, image_ref: &str) -> AppResult<Vec<u8>>;
}

/// Fetcher for remote URLs, inline data URIs and uploaded files on disk
///
/// Local paths are only served from `upload_dir`: relative references are
/// resolved against it, and anything whose canonical path falls outside it is
/// refused.
#[derive(Clone)]
pub struct HttpImageFetcher {
    http_client: HttpClient,
    upload_dir: PathBuf,
    max_bytes: usize,
}

impl HttpImageFetcher {
    /// Creates a fetcher whose remote requests give up after `timeout`
    pub fn new(timeout: Duration, upload_dir: impl Into<PathBuf>) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            upload_dir: upload_dir.into(),
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    async fn fetch_remote(&self, url: &str) -> AppResult<Vec<u8>> {
        let mut response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::ImageFetchFailure(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(AppError::ImageFetchFailure(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        let too_large = || {
            AppError::ImageFetchFailure(format!("{} exceeds {} bytes", url, self.max_bytes))
        };

        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AppError::ImageFetchFailure(format!("{}: {}", url, e)))?
        {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }

    async fn read_upload(&self, image_ref: &str) -> AppResult<Vec<u8>> {
        let root = tokio::fs::canonicalize(&self.upload_dir).await.map_err(|e| {
            AppError::ImageFetchFailure(format!(
                "upload dir {}: {}",
                self.upload_dir.display(),
                e
            ))
        })?;

        let requested = Path::new(image_ref);
        let candidate = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            root.join(requested)
        };

        let resolved = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|e| AppError::ImageFetchFailure(format!("{}: {}", image_ref, e)))?;

        if !resolved.starts_with(&root) {
            tracing::warn!(image_ref = %image_ref, "Refusing image path outside upload dir");
            return Err(AppError::ImageFetchFailure(format!(
                "{} is outside the upload directory",
                image_ref
            )));
        }

        tokio::fs::read(&resolved)
            .await
            .map_err(|e| AppError::ImageFetchFailure(format!("{}: {}", image_ref, e)))
    }
}

#[async_trait::async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, image_ref: &str) -> AppResult<Vec<u8>> {
        let image_ref = image_ref.trim();
        if image_ref.is_empty() {
            return Err(AppError::ImageFetchFailure("empty image reference".to_string()));
        }

        if image_ref.starts_with("http://") || image_ref.starts_with("https://") {
            return self.fetch_remote(image_ref).await;
        }

        if image_ref.starts_with("data:") {
            return decode_data_uri(image_ref);
        }

        self.read_upload(image_ref).await
    }
}

/// Decodes the payload of a base64 `data:` URI
pub fn decode_data_uri(uri: &str) -> AppResult<Vec<u8>> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| AppError::ImageFetchFailure("data URI without payload".to_string()))?;

    if !header.ends_with(";base64") {
        return Err(AppError::ImageFetchFailure(
            "only base64 data URIs are supported".to_string(),
        ));
    }

    STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::ImageFetchFailure(format!("invalid base64 payload: {}", e)))
}

/// Decodes any supported format and re-encodes it as RGB JPEG
pub fn normalize_image(bytes: &[u8], quality: u8) -> AppResult<Vec<u8>> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| AppError::ImageDecodeFailure(e.to_string()))?;
    let rgb = image::DynamicImage::ImageRgb8(decoded.to_rgb8());

    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .map_err(|e| AppError::ImageDecodeFailure(format!("re-encode failed: {}", e)))?;

    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png_bytes() -> Vec<u8> {
        let img = RgbaImage::from_pixel(4, 3, Rgba([200, 10, 10, 128]));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_normalize_produces_rgb_jpeg() {
        let jpeg = normalize_image(&png_bytes(), 85).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        let result = normalize_image(b"definitely not an image", 85);
        assert!(matches!(result, Err(AppError::ImageDecodeFailure(_))));
    }

    #[test]
    fn test_decode_data_uri() {
        let uri = format!("data:image/png;base64,{}", STANDARD.encode(b"abc"));
        assert_eq!(decode_data_uri(&uri).unwrap(), b"abc".to_vec());
    }

    #[test]
    fn test_decode_data_uri_requires_base64() {
        assert!(matches!(
            decode_data_uri("data:text/plain,hello"),
            Err(AppError::ImageFetchFailure(_))
        ));
        assert!(matches!(
            decode_data_uri("data:image/png;base64"),
            Err(AppError::ImageFetchFailure(_))
        ));
    }

    /// Fresh directory under the system temp dir
    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("uploads-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn fetcher(upload_dir: &Path) -> HttpImageFetcher {
        HttpImageFetcher::new(Duration::from_secs(2), upload_dir).unwrap()
    }

    /// Serves one raw HTTP response on a local port and returns its URL
    async fn serve_once(head: String, body: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{}/image.png", addr)
    }

    #[tokio::test]
    async fn test_fetch_missing_file() {
        let dir = scratch_dir();
        let result = fetcher(&dir).fetch("missing.jpg").await;
        assert!(matches!(result, Err(AppError::ImageFetchFailure(_))));
    }

    #[tokio::test]
    async fn test_fetch_reads_upload_by_relative_name() {
        let dir = scratch_dir();
        let png = png_bytes();
        std::fs::write(dir.join("look.png"), &png).unwrap();

        let fetcher = fetcher(&dir);
        assert_eq!(fetcher.fetch("look.png").await.unwrap(), png);

        let absolute = dir.join("look.png");
        assert_eq!(fetcher.fetch(absolute.to_str().unwrap()).await.unwrap(), png);
    }

    #[tokio::test]
    async fn test_fetch_rejects_system_file() {
        let dir = scratch_dir();
        let result = fetcher(&dir).fetch("/etc/passwd").await;
        assert!(matches!(result, Err(AppError::ImageFetchFailure(_))));
    }

    #[tokio::test]
    async fn test_fetch_rejects_traversal_out_of_upload_dir() {
        let parent = scratch_dir();
        let uploads = parent.join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();
        std::fs::write(parent.join("secret.png"), png_bytes()).unwrap();

        let result = fetcher(&uploads).fetch("../secret.png").await;
        assert!(matches!(result, Err(AppError::ImageFetchFailure(_))));
    }

    #[tokio::test]
    async fn test_fetch_empty_reference() {
        let dir = scratch_dir();
        assert!(fetcher(&dir).fetch("  ").await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_data_uri() {
        let dir = scratch_dir();
        let png = png_bytes();
        let uri = format!("data:image/png;base64,{}", STANDARD.encode(&png));
        assert_eq!(fetcher(&dir).fetch(&uri).await.unwrap(), png);
    }

    #[tokio::test]
    async fn test_fetch_remote_within_limit() {
        let body = png_bytes();
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let url = serve_once(head, body.clone()).await;

        let fetched = fetcher(&scratch_dir()).fetch(&url).await.unwrap();
        assert_eq!(fetched, body);
    }

    #[tokio::test]
    async fn test_fetch_remote_rejects_declared_oversize_body() {
        let body = vec![0u8; 64];
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let url = serve_once(head, body).await;

        let result = fetcher(&scratch_dir()).with_max_bytes(16).fetch(&url).await;
        assert!(matches!(result, Err(AppError::ImageFetchFailure(_))));
    }

    #[tokio::test]
    async fn test_fetch_remote_rejects_streamed_oversize_body() {
        // No Content-Length: the body is only bounded while reading it
        let head = "HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n".to_string();
        let url = serve_once(head, vec![0u8; 64]).await;

        let result = fetcher(&scratch_dir()).with_max_bytes(16).fetch(&url).await;
        assert!(matches!(result, Err(AppError::ImageFetchFailure(_))));
    }
}
