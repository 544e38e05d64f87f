//! Streaming HTTP fetcher.
//!
//! Downloads a URL into a caller-provided file, reporting progress after
//! every received chunk. The caller owns the destination (normally a staged
//! temp file) and decides what happens to it afterwards.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use super::{BoxFuture, DownloadError};
use crate::cache::naming::DEFAULT_EXTENSION;

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Write buffer size (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Progress callback: `(bytes_written, total_bytes)`.
///
/// `total_bytes` is `None` when the server sent no `Content-Length`.
pub type ProgressFn<'a> = &'a (dyn Fn(u64, Option<u64>) + Send + Sync);

/// Result of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Bytes written to the destination.
    pub bytes_written: u64,
    /// `Content-Type` reported by the server, if any.
    pub content_type: Option<String>,
}

/// Transfers a URL into a local file.
///
/// Implementations must write the full body to `dest` before resolving and
/// must stop writing once the returned future is dropped.
pub trait Fetcher: Send + Sync {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        dest: &'a Path,
        on_progress: ProgressFn<'a>,
    ) -> BoxFuture<'a, Result<FetchOutcome, DownloadError>>;
}

/// [`Fetcher`] backed by an async `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a fetcher with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wallstash/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, timeout })
    }

    /// Configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn stream_to_file(
        &self,
        url: &str,
        dest: &Path,
        on_progress: ProgressFn<'_>,
    ) -> Result<FetchOutcome, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::network(
                url,
                format!("HTTP status {}", status),
            ));
        }

        let total = response.content_length();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let file = File::create(dest)
            .await
            .map_err(|e| DownloadError::storage(format!("{}: {}", dest.display(), e)))?;
        let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);
        let mut written: u64 = 0;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DownloadError::network(url, e))?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| DownloadError::storage(format!("{}: {}", dest.display(), e)))?;
            written += chunk.len() as u64;
            on_progress(written, total);
        }

        writer
            .flush()
            .await
            .map_err(|e| DownloadError::storage(format!("{}: {}", dest.display(), e)))?;

        if let Some(expected) = total {
            if written != expected {
                return Err(DownloadError::network(
                    url,
                    format!("body ended after {} of {} bytes", written, expected),
                ));
            }
        }

        debug!(url = %url, bytes = written, content_type = ?content_type, "Transfer finished");
        Ok(FetchOutcome {
            bytes_written: written,
            content_type,
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        dest: &'a Path,
        on_progress: ProgressFn<'a>,
    ) -> BoxFuture<'a, Result<FetchOutcome, DownloadError>> {
        Box::pin(self.stream_to_file(url, dest, on_progress))
    }
}

/// Pick a file extension for a downloaded artifact.
///
/// The `Content-Type` wins when it names a known media type; otherwise the
/// extension of the URL path is used, falling back to `jpg`.
///
/// # Example
///
/// ```
/// use wallstash::download::extension_for;
///
/// assert_eq!(extension_for(Some("image/png"), "https://host/file"), "png");
/// assert_eq!(extension_for(None, "https://host/a/b.WEBP?x=1"), "webp");
/// assert_eq!(extension_for(Some("application/octet-stream"), "https://host/file"), "jpg");
/// ```
pub fn extension_for(content_type: Option<&str>, url: &str) -> String {
    content_type
        .and_then(extension_from_content_type)
        .map(str::to_string)
        .or_else(|| extension_from_url(url))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let ext = match mime.as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" | "image/x-ms-bmp" => "bmp",
        "image/tiff" => "tiff",
        "image/heic" | "image/heif" => "heic",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        _ => return None,
    };
    Some(ext)
}

fn extension_from_url(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let name = path.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 5 {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_wins() {
        assert_eq!(
            extension_for(Some("image/png"), "https://host/pic.jpg"),
            "png"
        );
        assert_eq!(
            extension_for(Some("image/jpeg; charset=binary"), "https://host/x"),
            "jpg"
        );
        assert_eq!(extension_for(Some("Video/MP4"), "https://host/x"), "mp4");
    }

    #[test]
    fn test_url_extension_fallback() {
        assert_eq!(extension_for(None, "https://host/dir/pic.PNG"), "png");
        assert_eq!(
            extension_for(Some("application/octet-stream"), "https://host/a.webm?sig=abc"),
            "webm"
        );
        assert_eq!(extension_for(None, "relative/path/scene.gif#frag"), "gif");
    }

    #[test]
    fn test_default_extension() {
        assert_eq!(extension_for(None, "https://host/download"), "jpg");
        assert_eq!(extension_for(None, "https://host/.hidden"), "jpg");
        assert_eq!(extension_for(None, "https://host/file.toolongext"), "jpg");
        assert_eq!(extension_for(None, "https://host/v1.2/file"), "jpg");
    }

    #[test]
    fn test_fetcher_timeout() {
        let fetcher = HttpFetcher::with_timeout(Duration::from_secs(12)).unwrap();
        assert_eq!(fetcher.timeout(), Duration::from_secs(12));
    }
}
