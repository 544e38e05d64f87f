//! Error types surfaced by the fetch coordinator.
//!
//! Every failure that leaves the coordinator is one of four kinds. Raw
//! platform errors (`io::Error`, `reqwest::Error`) are flattened into
//! messages at this boundary, which also keeps the error `Clone` so one
//! result can be handed to every caller waiting on the same attempt.

use thiserror::Error;

use crate::cache::CacheError;

/// Failure category, for callers that branch on kind rather than message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport or HTTP failure.
    Network,
    /// Filesystem failure.
    Storage,
    /// Nothing cached and no local candidate (internal miss signal).
    NotFound,
    /// The attempt was cancelled.
    Cancelled,
}

/// Errors returned by download operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DownloadError {
    /// Transport or HTTP failure while fetching.
    #[error("Network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    /// Filesystem failure (permissions, disk full, missing temp file).
    #[error("Storage error: {reason}")]
    Storage { reason: String },

    /// No cached copy and no local candidate.
    #[error("No local copy of {reference}")]
    NotFound { reference: String },

    /// The attempt was cancelled before it finished.
    #[error("Download of {reference} was cancelled")]
    Cancelled { reference: String },
}

impl DownloadError {
    /// Create a network error.
    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a storage error.
    pub fn storage(reason: impl ToString) -> Self {
        Self::Storage {
            reason: reason.to_string(),
        }
    }

    /// Failure category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Whether re-invoking the download might succeed.
    ///
    /// Only network errors qualify; nothing is retried automatically.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Network
    }

    /// Whether this is a cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }

    /// One human-readable message per failure kind.
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Network => "The download failed. Check your connection and try again.",
            ErrorKind::Storage => {
                "The file could not be saved. Check available disk space and folder permissions."
            }
            ErrorKind::NotFound => "This item has not been downloaded yet.",
            ErrorKind::Cancelled => "The download was cancelled.",
        }
    }
}

impl From<CacheError> for DownloadError {
    fn from(e: CacheError) -> Self {
        Self::storage(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_kind_and_retry() {
        let err = DownloadError::network("https://host/file.png", "connection reset");
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.is_retryable());

        let err = DownloadError::storage("disk full");
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_cancelled_is_not_a_failure_message() {
        let err = DownloadError::Cancelled {
            reference: "42".into(),
        };
        assert!(err.is_cancelled());
        assert!(!err.is_retryable());
        assert!(err.user_message().contains("cancelled"));
    }

    #[test]
    fn test_user_messages_differ_per_kind() {
        let network = DownloadError::network("u", "r").user_message();
        let storage = DownloadError::storage("r").user_message();
        assert_ne!(network, storage);
        assert!(storage.contains("disk"));
        assert!(network.contains("try again"));
    }

    #[test]
    fn test_from_cache_error_flattens_io() {
        let cache_err = CacheError::Io {
            path: "/cache/full/42_Sunset.png".into(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let err: DownloadError = cache_err.into();

        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.to_string().contains("42_Sunset.png"));
    }
}
