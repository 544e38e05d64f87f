//! Fetch coordinator.
//!
//! Turns "make sure reference R is on disk" into at most one running attempt
//! per reference. An attempt walks three sources in order:
//!
//! ```text
//! ensure_local(R)
//!     │
//!     ├─ CacheStore::lookup(R) ── hit ──────────────────────► Completed
//!     │
//!     ├─ in-flight attempt for R? ── yes ── await its result
//!     │
//!     └─ spawn attempt
//!            ├─ LocalSourceResolver (blocking task)
//!            │      └─ candidate > threshold ── import ─────► Completed
//!            │
//!            └─ Fetcher (bounded by the transfer semaphore)
//!                   ├─ progress ──► ProgressTracker
//!                   └─ CacheStore::store_as ────────────────► Completed
//! ```
//!
//! Attempts run as their own tasks, so a caller dropping its future does not
//! abort a download other callers are waiting on. Only [`cancel`] and
//! [`pause`] stop an attempt, and only before it starts writing to the
//! cache store. Once the commit begins the attempt runs to completion and
//! `cancel` reports that nothing was stopped.
//!
//! [`cancel`]: FetchCoordinator::cancel
//! [`pause`]: FetchCoordinator::pause

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::{FutureExt, Shared};
use parking_lot::Mutex;
use tempfile::TempPath;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::http::{extension_for, Fetcher};
use super::progress::ProgressTracker;
use super::state::{AttemptId, TransferEvent, TransferState};
use super::{BoxFuture, DownloadError, DownloadRequest, ErrorKind};
use crate::cache::CacheStore;
use crate::local_source::{LocalSourceResolver, DEFAULT_MIN_QUALITY_BYTES};

/// Default number of simultaneous network transfers.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Staging extension for in-progress network transfers.
const PARTIAL_EXTENSION: &str = "part";

type SharedResult = Shared<BoxFuture<'static, Result<PathBuf, DownloadError>>>;

/// Tunables for the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Maximum simultaneous network transfers across all references.
    pub max_concurrent: usize,
    /// Local candidates must be larger than this to be imported.
    pub min_quality_bytes: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            min_quality_bytes: DEFAULT_MIN_QUALITY_BYTES,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    pub fn with_min_quality_bytes(mut self, bytes: u64) -> Self {
        self.min_quality_bytes = bytes;
        self
    }
}

struct InFlight {
    attempt: AttemptId,
    token: CancellationToken,
    result: SharedResult,
    /// Set once the attempt started writing to the store.
    committing: bool,
}

/// What the cancellable stage of an attempt produced.
enum Acquired {
    /// Another attempt already stored the reference.
    Cached(PathBuf),
    /// A complete file in the staging directory, ready to commit.
    Staged { file: TempPath, extension: String },
}

struct Inner {
    store: Arc<CacheStore>,
    resolver: Arc<dyn LocalSourceResolver>,
    fetcher: Arc<dyn Fetcher>,
    tracker: Arc<ProgressTracker>,
    limiter: Semaphore,
    min_quality_bytes: u64,
    in_flight: Mutex<HashMap<String, InFlight>>,
}

/// Deduplicating, cancellable download front door.
///
/// Cheap to clone; clones share all state.
///
/// # Example
///
/// ```ignore
/// let coordinator = FetchCoordinator::new(store, resolver, fetcher, tracker, CoordinatorConfig::default());
/// let request = DownloadRequest::new("42", "https://host/file.png", "Sunset");
/// let path = coordinator.ensure_local(request).await?;
/// ```
#[derive(Clone)]
pub struct FetchCoordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for FetchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("cache_root", &self.inner.store.root())
            .field("in_flight", &self.inner.in_flight.lock().len())
            .field("min_quality_bytes", &self.inner.min_quality_bytes)
            .finish()
    }
}

impl FetchCoordinator {
    /// Create a coordinator over the given store, sources and tracker.
    pub fn new(
        store: Arc<CacheStore>,
        resolver: Arc<dyn LocalSourceResolver>,
        fetcher: Arc<dyn Fetcher>,
        tracker: Arc<ProgressTracker>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                resolver,
                fetcher,
                tracker,
                limiter: Semaphore::new(config.max_concurrent.max(1)),
                min_quality_bytes: config.min_quality_bytes,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The cache store downloads land in.
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.inner.store
    }

    /// The tracker consumers observe.
    pub fn tracker(&self) -> &Arc<ProgressTracker> {
        &self.inner.tracker
    }

    /// Whether an attempt for `reference` is running.
    pub fn is_in_flight(&self, reference: &str) -> bool {
        self.inner.in_flight.lock().contains_key(reference)
    }

    /// Number of running attempts.
    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    /// Make sure `request.reference` is cached and return its path.
    ///
    /// A cache hit returns immediately without touching the network.
    /// Concurrent calls for the same reference share one attempt and all
    /// receive its result.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::Network`] if the transfer failed
    /// - [`DownloadError::Storage`] if the file could not be written or moved
    /// - [`DownloadError::Cancelled`] if the attempt was cancelled or paused
    pub async fn ensure_local(&self, request: DownloadRequest) -> Result<PathBuf, DownloadError> {
        if let Some(path) = self.inner.store.lookup(&request.reference).await {
            debug!(reference = %request.reference, "Cache hit");
            if !self.is_in_flight(&request.reference) {
                self.inner.tracker.mark_completed(&request.reference);
            }
            return Ok(path);
        }

        let result = {
            let mut in_flight = self.inner.in_flight.lock();
            match in_flight.get(&request.reference) {
                Some(existing) => {
                    debug!(
                        reference = %request.reference,
                        attempt = %existing.attempt,
                        "Joining in-flight attempt"
                    );
                    existing.result.clone()
                }
                None => {
                    let reference = request.reference.clone();
                    let attempt = self.inner.tracker.begin_attempt(&reference);
                    let token = CancellationToken::new();
                    let result = self.spawn_attempt(request, attempt, token.clone());
                    in_flight.insert(
                        reference,
                        InFlight {
                            attempt,
                            token,
                            result: result.clone(),
                            committing: false,
                        },
                    );
                    result
                }
            }
        };

        result.await
    }

    /// Stop the running attempt for `reference` and discard its partial data.
    ///
    /// Waiters receive [`DownloadError::Cancelled`] and the state returns to
    /// `NotStarted`. Returns `false` if nothing was running, or if the attempt
    /// is already committing its file to the store.
    pub fn cancel(&self, reference: &str) -> bool {
        let stopped = self.stop(reference, TransferState::NotStarted);
        if stopped {
            info!(reference = %reference, "Download cancelled");
        }
        stopped
    }

    /// Like [`cancel`](Self::cancel), but the state becomes `Paused`.
    ///
    /// Partial data is discarded; the next `ensure_local` starts over.
    pub fn pause(&self, reference: &str) -> bool {
        let stopped = self.stop(reference, TransferState::Paused);
        if stopped {
            info!(reference = %reference, "Download paused");
        }
        stopped
    }

    /// Cancel every running attempt; returns how many were stopped.
    pub fn cancel_all(&self) -> usize {
        let references: Vec<String> = self.inner.in_flight.lock().keys().cloned().collect();
        references
            .iter()
            .filter(|reference| self.cancel(reference))
            .count()
    }

    fn stop(&self, reference: &str, state: TransferState) -> bool {
        // The tracker is updated under the in-flight lock so a new attempt
        // cannot slip in between and be stopped by mistake.
        let mut in_flight = self.inner.in_flight.lock();
        let committing = match in_flight.get(reference) {
            Some(entry) => entry.committing,
            None => return false,
        };
        if committing {
            debug!(reference = %reference, "Attempt already committing, not stopped");
            return false;
        }

        let Some(entry) = in_flight.remove(reference) else {
            return false;
        };
        entry.token.cancel();
        self.inner
            .tracker
            .stop_attempt(reference, entry.attempt, state);
        true
    }

    fn spawn_attempt(
        &self,
        request: DownloadRequest,
        attempt: AttemptId,
        token: CancellationToken,
    ) -> SharedResult {
        let inner = Arc::clone(&self.inner);
        let reference = request.reference.clone();
        let handle = tokio::spawn(async move { inner.run_attempt(request, attempt, token).await });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Err(DownloadError::Cancelled { reference }),
                Err(e) => Err(DownloadError::storage(format!("download task failed: {}", e))),
            }
        }
        .boxed()
        .shared()
    }
}

impl Inner {
    async fn run_attempt(
        &self,
        request: DownloadRequest,
        attempt: AttemptId,
        token: CancellationToken,
    ) -> Result<PathBuf, DownloadError> {
        let acquired = tokio::select! {
            biased;
            _ = token.cancelled() => Err(DownloadError::Cancelled {
                reference: request.reference.clone(),
            }),
            acquired = self.acquire(&request, attempt) => acquired,
        };

        let result = match acquired {
            Ok(acquired) => self.commit(&request, attempt, acquired).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => {
                self.tracker
                    .apply(TransferEvent::completed(&request.reference, attempt));
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                warn!(reference = %request.reference, error = %e, "Download failed");
                self.tracker
                    .apply(TransferEvent::failed(&request.reference, attempt, e.to_string()));
            }
        }

        self.finish(&request.reference, attempt);
        result
    }

    /// Drop the in-flight entry, unless a newer attempt already replaced it.
    fn finish(&self, reference: &str, attempt: AttemptId) {
        let mut in_flight = self.in_flight.lock();
        if in_flight
            .get(reference)
            .is_some_and(|entry| entry.attempt == attempt)
        {
            in_flight.remove(reference);
        }
    }

    /// Claim the right to write `attempt` into the store.
    ///
    /// Fails if the attempt was cancelled or paused. After this succeeds,
    /// `stop` leaves the attempt alone.
    fn begin_commit(&self, reference: &str, attempt: AttemptId) -> bool {
        let mut in_flight = self.in_flight.lock();
        match in_flight.get_mut(reference) {
            Some(entry) if entry.attempt == attempt && !entry.token.is_cancelled() => {
                entry.committing = true;
                true
            }
            _ => false,
        }
    }

    /// Move a staged file into the store. Not cancellable.
    async fn commit(
        &self,
        request: &DownloadRequest,
        attempt: AttemptId,
        acquired: Acquired,
    ) -> Result<PathBuf, DownloadError> {
        if !self.begin_commit(&request.reference, attempt) {
            // Dropping a staged file deletes it
            debug!(reference = %request.reference, "Attempt stopped before commit");
            return Err(DownloadError::Cancelled {
                reference: request.reference.clone(),
            });
        }

        let (file, extension) = match acquired {
            Acquired::Cached(path) => return Ok(path),
            Acquired::Staged { file, extension } => (file, extension),
        };
        let path = self
            .store
            .store_as(&request.reference, &file, &request.display_name, &extension)
            .await?;
        info!(reference = %request.reference, path = %path.display(), "Committed to cache");
        Ok(path)
    }

    /// The cancellable stage: produce a staged file without touching the store.
    async fn acquire(
        &self,
        request: &DownloadRequest,
        attempt: AttemptId,
    ) -> Result<Acquired, DownloadError> {
        // Another attempt may have finished between the caller's lookup and ours
        if let Some(path) = self.store.lookup(&request.reference).await {
            return Ok(Acquired::Cached(path));
        }

        match self.stage_local(request).await {
            Ok(acquired) => return Ok(acquired),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(
                    reference = %request.reference,
                    error = %e,
                    "Local copy could not be imported, falling back to network"
                );
            }
        }

        self.fetch_remote(request, attempt).await
    }

    /// Stage a full-quality local copy, or report `NotFound`.
    async fn stage_local(&self, request: &DownloadRequest) -> Result<Acquired, DownloadError> {
        let not_found = || DownloadError::NotFound {
            reference: request.reference.clone(),
        };

        let resolver = Arc::clone(&self.resolver);
        let reference = request.reference.clone();
        let candidate = tokio::task::spawn_blocking(move || resolver.find_local_candidate(&reference))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Local source lookup panicked");
                None
            });

        let Some(candidate) = candidate else {
            return Err(not_found());
        };
        if candidate.size_bytes <= self.min_quality_bytes {
            debug!(
                reference = %request.reference,
                size = candidate.size_bytes,
                "Local candidate below quality threshold"
            );
            return Err(not_found());
        }

        let file = self.store.stage_copy(&candidate.path).await?;
        let extension = candidate
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        info!(
            reference = %request.reference,
            source = %candidate.path.display(),
            "Staged local copy"
        );
        Ok(Acquired::Staged { file, extension })
    }

    async fn fetch_remote(
        &self,
        request: &DownloadRequest,
        attempt: AttemptId,
    ) -> Result<Acquired, DownloadError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| DownloadError::storage("transfer limiter closed"))?;

        // Deleted on drop, so a cancelled or failed transfer leaves nothing behind
        let staged = self.store.staging_file(PARTIAL_EXTENSION)?;

        let tracker = Arc::clone(&self.tracker);
        let reference = request.reference.clone();
        let on_progress = move |written: u64, total: Option<u64>| {
            if let Some(total) = total.filter(|t| *t > 0) {
                let fraction = written as f64 / total as f64;
                tracker.apply(TransferEvent::progress(reference.as_str(), attempt, fraction));
            }
        };

        debug!(reference = %request.reference, url = %request.source_url, "Fetching");
        let outcome = self
            .fetcher
            .fetch(&request.source_url, &staged, &on_progress)
            .await?;

        info!(
            reference = %request.reference,
            bytes = outcome.bytes_written,
            "Downloaded"
        );
        Ok(Acquired::Staged {
            file: staged,
            extension: extension_for(outcome.content_type.as_deref(), &request.source_url),
        })
    }
}
