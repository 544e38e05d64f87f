//! Download coordination and progress tracking.
//!
//! This module turns a [`DownloadRequest`] into a cached file:
//! - Deduplicated, cancellable fetch attempts (`coordinator`)
//! - Streaming HTTP transfer with chunk-level progress (`http`)
//! - Per-reference transfer state observable by consumers (`progress`)
//! - The error taxonomy surfaced to callers (`error`)
//!
//! # Architecture
//!
//! ```text
//! FetchCoordinator
//!         │
//!         ├── CacheStore (hit? relocate, manifest)
//!         │
//!         ├── LocalSourceResolver (trait)
//!         │       └── DirectoryResolver
//!         │
//!         ├── Fetcher (trait)
//!         │       └── HttpFetcher
//!         │
//!         └── ProgressTracker ◄── TransferEvent (attempt-stamped)
//!                 │
//!                 └── broadcast::Receiver<StatusUpdate> (consumers)
//! ```

mod coordinator;
mod error;
mod http;
mod progress;
mod state;

use std::future::Future;
use std::pin::Pin;

pub use coordinator::{CoordinatorConfig, FetchCoordinator, DEFAULT_MAX_CONCURRENT};
pub use error::{DownloadError, ErrorKind};
pub use http::{extension_for, FetchOutcome, Fetcher, HttpFetcher, ProgressFn, DEFAULT_TIMEOUT_SECS};
pub use progress::ProgressTracker;
pub use state::{AttemptId, StatusUpdate, TransferEvent, TransferEventKind, TransferState};

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What the catalog layer hands to the core: which item, where to get it,
/// and what to call it on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Stable content reference.
    pub reference: String,
    /// Direct URL of the full-resolution file.
    pub source_url: String,
    /// Human-readable title used in the cache filename.
    pub display_name: String,
}

impl DownloadRequest {
    /// Create a new download request.
    pub fn new(
        reference: impl Into<String>,
        source_url: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            source_url: source_url.into(),
            display_name: display_name.into(),
        }
    }
}
