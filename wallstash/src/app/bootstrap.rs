//! Application bootstrap implementation.
//!
//! `WallstashApp` builds every component exactly once, in dependency order,
//! and hands out shared handles. There are no global singletons: two apps
//! over two cache directories are fully independent.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing::info;

use super::config::AppConfig;
use super::error::{AppError, ApplyError};
use crate::cache::{CacheEntry, CacheError, CacheStore};
use crate::desktop::{CommandSink, DesktopSink};
use crate::download::{
    DownloadError, DownloadRequest, FetchCoordinator, Fetcher, HttpFetcher, ProgressTracker,
};
use crate::local_source::{
    workshop_content_dirs, DirectoryResolver, LocalSourceResolver, NoLocalSource,
};

/// Wallstash application: cache store, tracker and coordinator wired up.
///
/// # Example
///
/// ```ignore
/// use wallstash::app::{AppConfig, WallstashApp};
/// use wallstash::download::DownloadRequest;
///
/// let app = WallstashApp::start(AppConfig::new(cache_dir)).await?;
/// let path = app
///     .ensure_local(DownloadRequest::new("42", "https://host/file.png", "Sunset"))
///     .await?;
/// app.shutdown().await;
/// ```
pub struct WallstashApp {
    config: AppConfig,
    store: Arc<CacheStore>,
    tracker: Arc<ProgressTracker>,
    coordinator: FetchCoordinator,
    /// Owned runtime when created via `start_sync()`.
    runtime: Option<Runtime>,
}

impl std::fmt::Debug for WallstashApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WallstashApp")
            .field("config", &self.config)
            .field("coordinator", &self.coordinator)
            .field("owns_runtime", &self.runtime.is_some())
            .finish()
    }
}

impl WallstashApp {
    /// Start the application with the given configuration.
    ///
    /// This method:
    /// 1. Opens (and reconciles) the cache store
    /// 2. Builds the local-source resolver, detecting Steam folders if enabled
    /// 3. Creates the HTTP fetcher, progress tracker and coordinator
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be opened or the HTTP
    /// client cannot be created.
    pub async fn start(config: AppConfig) -> Result<Self, AppError> {
        let fetcher = HttpFetcher::with_timeout(config.timeout)
            .map_err(|e| AppError::HttpClient(e.to_string()))?;
        let resolver = Self::build_resolver(&config);
        Self::start_with(config, resolver, Arc::new(fetcher)).await
    }

    /// Start with explicit resolver and fetcher implementations.
    pub async fn start_with(
        config: AppConfig,
        resolver: Arc<dyn LocalSourceResolver>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, AppError> {
        info!(cache_dir = %config.cache_dir.display(), "Starting wallstash");

        let store = Arc::new(
            CacheStore::open(&config.cache_dir)
                .await
                .map_err(AppError::CacheOpen)?,
        );
        let tracker = Arc::new(ProgressTracker::new());
        let coordinator = FetchCoordinator::new(
            Arc::clone(&store),
            resolver,
            fetcher,
            Arc::clone(&tracker),
            config.coordinator_config(),
        );

        info!(
            max_concurrent = config.max_concurrent,
            local_source = config.local_source.enabled,
            "Download coordinator ready"
        );

        Ok(Self {
            config,
            store,
            tracker,
            coordinator,
            runtime: None,
        })
    }

    /// Start the application synchronously (creates its own runtime).
    ///
    /// For callers without an async context, such as CLI command handlers.
    /// Use [`block_on`](Self::block_on) to drive the app's futures.
    pub fn start_sync(config: AppConfig) -> Result<Self, AppError> {
        let runtime = Runtime::new().map_err(|e| AppError::RuntimeCreation(e.to_string()))?;
        let mut app = runtime.block_on(Self::start(config))?;
        app.runtime = Some(runtime);
        Ok(app)
    }

    /// Run a future on the app's own runtime.
    ///
    /// # Errors
    ///
    /// Returns `AppError::RuntimeCreation` if the app was not created with
    /// [`start_sync`](Self::start_sync).
    pub fn block_on<F: Future>(&self, future: F) -> Result<F::Output, AppError> {
        self.runtime
            .as_ref()
            .map(|runtime| runtime.block_on(future))
            .ok_or_else(|| AppError::RuntimeCreation("app has no owned runtime".to_string()))
    }

    fn build_resolver(config: &AppConfig) -> Arc<dyn LocalSourceResolver> {
        let settings = &config.local_source;
        if !settings.enabled {
            return Arc::new(NoLocalSource);
        }

        let mut roots: Vec<PathBuf> = settings
            .workshop_app_id
            .as_deref()
            .map(workshop_content_dirs)
            .unwrap_or_default();
        roots.extend(settings.directories.iter().cloned());

        info!(roots = roots.len(), "Local source folders configured");
        Arc::new(DirectoryResolver::new(roots).with_min_quality_bytes(settings.min_quality_bytes))
    }

    /// Application configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Shared cache store.
    pub fn store(&self) -> Arc<CacheStore> {
        Arc::clone(&self.store)
    }

    /// Shared progress tracker.
    pub fn tracker(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.tracker)
    }

    /// Fetch coordinator (cheap to clone).
    pub fn coordinator(&self) -> FetchCoordinator {
        self.coordinator.clone()
    }

    /// See [`FetchCoordinator::ensure_local`].
    pub async fn ensure_local(&self, request: DownloadRequest) -> Result<PathBuf, DownloadError> {
        self.coordinator.ensure_local(request).await
    }

    /// Remove a cached item and reset its tracked state.
    pub async fn delete(&self, reference: &str) -> Result<bool, CacheError> {
        self.coordinator.cancel(reference);
        let deleted = self.store.delete(reference).await?;
        self.tracker.forget(reference);
        Ok(deleted)
    }

    /// All cached items.
    pub async fn list(&self) -> Result<Vec<CacheEntry>, CacheError> {
        self.store.list_all().await
    }

    /// Desktop sink from the configured command, or the platform default.
    pub fn desktop_sink(&self) -> Result<CommandSink, AppError> {
        match &self.config.desktop_command {
            Some(template) => {
                CommandSink::from_template(template).map_err(|e| AppError::Config(e.to_string()))
            }
            None => CommandSink::platform_default().ok_or_else(|| {
                AppError::Config(
                    "No default desktop command for this platform; set desktop.command".to_string(),
                )
            }),
        }
    }

    /// Make the item available locally, then hand it to `sink`.
    ///
    /// Returns the local path on success. A sink failure is returned as-is.
    pub async fn apply(
        &self,
        request: DownloadRequest,
        sink: &dyn DesktopSink,
    ) -> Result<PathBuf, ApplyError> {
        let path = self.coordinator.ensure_local(request).await?;
        sink.apply(&path).await?;
        Ok(path)
    }

    /// Shut down: cancel running downloads.
    pub async fn shutdown(self) {
        info!("Shutting down wallstash");
        let cancelled = self.coordinator.cancel_all();
        if cancelled > 0 {
            info!(cancelled, "Cancelled running downloads");
        }
        // Let cancelled attempts drop their staged files before the runtime goes
        tokio::task::yield_now().await;
        info!("Shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desktop::SinkError;
    use crate::download::{BoxFuture, FetchOutcome, ProgressFn};
    use parking_lot::Mutex;
    use std::path::Path;
    use tempfile::tempdir;

    struct StaticFetcher;

    impl Fetcher for StaticFetcher {
        fn fetch<'a>(
            &'a self,
            _url: &'a str,
            dest: &'a Path,
            on_progress: ProgressFn<'a>,
        ) -> BoxFuture<'a, Result<FetchOutcome, DownloadError>> {
            Box::pin(async move {
                tokio::fs::write(dest, b"jpeg bytes").await.unwrap();
                on_progress(10, Some(10));
                Ok(FetchOutcome {
                    bytes_written: 10,
                    content_type: Some("image/jpeg".to_string()),
                })
            })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        applied: Mutex<Vec<PathBuf>>,
        fail: bool,
    }

    impl DesktopSink for RecordingSink {
        fn apply<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<(), SinkError>> {
            Box::pin(async move {
                if self.fail {
                    return Err(SinkError::Failed {
                        program: "setbg".to_string(),
                        status: "exit status: 1".to_string(),
                        stderr: "no display".to_string(),
                    });
                }
                self.applied.lock().push(path.to_path_buf());
                Ok(())
            })
        }
    }

    async fn start_app(dir: &Path) -> WallstashApp {
        let config = AppConfig::new(dir.join("cache")).without_local_source();
        WallstashApp::start_with(config, Arc::new(NoLocalSource), Arc::new(StaticFetcher))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_app_start_and_shutdown() {
        let temp = tempdir().unwrap();
        let app = start_app(temp.path()).await;

        assert!(app.list().await.unwrap().is_empty());
        assert!(app.store().artifact_dir().is_dir());

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_apply_downloads_then_applies() {
        let temp = tempdir().unwrap();
        let app = start_app(temp.path()).await;
        let sink = RecordingSink::default();

        let path = app
            .apply(DownloadRequest::new("7", "https://host/x", "Night Sky"), &sink)
            .await
            .unwrap();

        assert!(path.ends_with("7_Night_Sky.jpg"));
        assert_eq!(*sink.applied.lock(), vec![path]);
    }

    #[tokio::test]
    async fn test_apply_returns_sink_failure() {
        let temp = tempdir().unwrap();
        let app = start_app(temp.path()).await;
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };

        let err = app
            .apply(DownloadRequest::new("7", "https://host/x", "Night Sky"), &sink)
            .await
            .unwrap_err();

        assert!(matches!(err, ApplyError::Sink(SinkError::Failed { .. })));
        // The download itself still succeeded
        assert!(app.store().lookup("7").await.is_some());
    }

    #[tokio::test]
    async fn test_delete_resets_state() {
        let temp = tempdir().unwrap();
        let app = start_app(temp.path()).await;
        app.ensure_local(DownloadRequest::new("7", "https://host/x", "A"))
            .await
            .unwrap();

        assert!(app.delete("7").await.unwrap());
        assert!(app.list().await.unwrap().is_empty());
        assert_eq!(
            app.tracker().state("7"),
            crate::download::TransferState::NotStarted
        );
        assert!(!app.delete("7").await.unwrap());
    }

    #[tokio::test]
    async fn test_apps_are_independent() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        let app_a = start_app(a.path()).await;
        let app_b = start_app(b.path()).await;

        app_a
            .ensure_local(DownloadRequest::new("1", "https://host/x", "One"))
            .await
            .unwrap();

        assert_eq!(app_a.list().await.unwrap().len(), 1);
        assert!(app_b.list().await.unwrap().is_empty());
    }

    #[test]
    fn test_desktop_sink_from_config() {
        let temp = tempdir().unwrap();
        let config = AppConfig::new(temp.path()).with_desktop_command("feh --bg-fill {path}");
        let app = WallstashApp::start_sync(config).unwrap();

        assert_eq!(app.desktop_sink().unwrap().program(), "feh");
        assert!(app.block_on(async { 1 + 1 }).is_ok());
    }

    #[test]
    fn test_resolver_disabled() {
        let config = AppConfig::new("/tmp/unused").without_local_source();
        let resolver = WallstashApp::build_resolver(&config);
        assert!(resolver.find_local_candidate("42").is_none());
    }
}
