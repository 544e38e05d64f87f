//! Local cache store for completed downloads.
//!
//! The cache is a directory of finished artifacts plus a manifest that indexes
//! them by content reference.
//!
//! # Layout
//!
//! ```text
//! {root}/
//! ├── full/            completed artifacts, `{reference}_{title}.{ext}`
//! ├── .staging/        partial downloads and local-source copies
//! └── manifest.json    reference -> absolute path
//! ```
//!
//! Everything that writes to the cache goes through [`CacheStore`]; consumers
//! only ever read the paths it hands out.

pub mod manifest;
pub mod naming;
mod store;

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub use manifest::Manifest;
pub use store::{CacheStore, ARTIFACT_DIR, STAGING_DIR};

/// Errors raised inside the cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem operation failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file handed to the store does not exist.
    #[error("Source file missing: {}", .0.display())]
    MissingFile(PathBuf),

    /// The manifest could not be encoded.
    #[error("Manifest error: {0}")]
    Manifest(String),
}

impl CacheError {
    /// Wrap an I/O error with the path it happened on.
    pub(crate) fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Path the error refers to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Io { path, .. } | Self::MissingFile(path) => Some(path),
            Self::Manifest(_) => None,
        }
    }
}

/// One completed, locally stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    /// Content reference.
    pub reference: String,
    /// Title recovered from the filename.
    pub title: String,
    /// Absolute path of the artifact, owned by the store.
    pub local_path: PathBuf,
    /// File size in bytes.
    pub size_bytes: u64,
    /// When the artifact landed in the cache.
    pub created_at: DateTime<Utc>,
}

/// Aggregate numbers for the whole cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of artifacts.
    pub entries: usize,
    /// Sum of artifact sizes.
    pub bytes: u64,
}

/// Result of clearing the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearResult {
    /// Number of artifacts deleted.
    pub files_deleted: usize,
    /// Bytes freed.
    pub bytes_freed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_error_display_includes_path() {
        let err = CacheError::io(
            "/cache/full/42_Sunset.png",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let display = err.to_string();
        assert!(display.contains("/cache/full/42_Sunset.png"));
        assert!(display.contains("denied"));
    }

    #[test]
    fn test_cache_error_path() {
        let err = CacheError::MissingFile(PathBuf::from("/tmp/x.part"));
        assert_eq!(err.path(), Some(Path::new("/tmp/x.part")));
        assert_eq!(CacheError::Manifest("bad".into()).path(), None);
    }
}
