//! Application error types.

use std::fmt;

use crate::cache::CacheError;
use crate::desktop::SinkError;
use crate::download::DownloadError;

/// Errors that can occur during application lifecycle.
#[derive(Debug)]
pub enum AppError {
    /// Failed to open the cache store.
    CacheOpen(CacheError),

    /// Failed to build the HTTP client.
    HttpClient(String),

    /// Configuration error.
    Config(String),

    /// Failed to create the Tokio runtime.
    RuntimeCreation(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::CacheOpen(e) => write!(f, "Failed to open cache: {}", e),
            AppError::HttpClient(msg) => write!(f, "Failed to create HTTP client: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::RuntimeCreation(msg) => {
                write!(f, "Failed to create Tokio runtime: {}", msg)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::CacheOpen(e) => Some(e),
            AppError::HttpClient(_) | AppError::Config(_) | AppError::RuntimeCreation(_) => None,
        }
    }
}

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        AppError::CacheOpen(e)
    }
}

/// Failure of [`WallstashApp::apply`](super::WallstashApp::apply).
///
/// The sink's own error is passed through untouched.
#[derive(Debug)]
pub enum ApplyError {
    /// The file could not be made available locally.
    Download(DownloadError),

    /// The desktop sink rejected the file.
    Sink(SinkError),
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyError::Download(e) => write!(f, "{}", e),
            ApplyError::Sink(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ApplyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplyError::Download(e) => Some(e),
            ApplyError::Sink(e) => Some(e),
        }
    }
}

impl From<DownloadError> for ApplyError {
    fn from(e: DownloadError) -> Self {
        ApplyError::Download(e)
    }
}

impl From<SinkError> for ApplyError {
    fn from(e: SinkError) -> Self {
        ApplyError::Sink(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config("cache directory missing".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("cache directory missing"));
    }

    #[test]
    fn test_app_error_from_cache_error() {
        let cache_err = CacheError::MissingFile("/tmp/x".into());
        let app_err: AppError = cache_err.into();
        assert!(matches!(app_err, AppError::CacheOpen(_)));
        assert!(std::error::Error::source(&app_err).is_some());
    }

    #[test]
    fn test_apply_error_passes_sink_message_through() {
        let sink_err = SinkError::InvalidTemplate("empty command".to_string());
        let expected = sink_err.to_string();
        let err: ApplyError = sink_err.into();
        assert_eq!(err.to_string(), expected);
    }
}
