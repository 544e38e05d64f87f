//! Application configuration for WallstashApp.
//!
//! `AppConfig` is everything `WallstashApp::start()` needs, independent of
//! where it came from (config file, CLI flags, tests).

use std::path::PathBuf;
use std::time::Duration;

use crate::config::ConfigFile;
use crate::download::{CoordinatorConfig, DEFAULT_MAX_CONCURRENT, DEFAULT_TIMEOUT_SECS};
use crate::local_source::{DEFAULT_MIN_QUALITY_BYTES, WALLPAPER_ENGINE_APP_ID};

/// Local-source settings for the application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalSourceAppConfig {
    /// Whether to look for local copies at all.
    pub enabled: bool,

    /// Steam app whose workshop folders are detected; `None` skips detection.
    pub workshop_app_id: Option<String>,

    /// Extra roots searched after the detected ones.
    pub directories: Vec<PathBuf>,

    /// Local files must be larger than this to be imported.
    pub min_quality_bytes: u64,
}

impl Default for LocalSourceAppConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            workshop_app_id: Some(WALLPAPER_ENGINE_APP_ID.to_string()),
            directories: Vec::new(),
            min_quality_bytes: DEFAULT_MIN_QUALITY_BYTES,
        }
    }
}

/// Application configuration combining all component configs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    /// Cache root directory.
    pub cache_dir: PathBuf,

    /// Maximum simultaneous network transfers.
    pub max_concurrent: usize,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// Local-source lookup.
    pub local_source: LocalSourceAppConfig,

    /// Desktop command template; `None` uses the platform default.
    pub desktop_command: Option<String>,
}

impl AppConfig {
    /// Create a config with defaults for everything but the cache location.
    ///
    /// # Arguments
    ///
    /// * `cache_dir` - Root directory of the cache
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            local_source: LocalSourceAppConfig::default(),
            desktop_command: None,
        }
    }

    /// Create application config from the configuration file.
    pub fn from_config_file(config: &ConfigFile) -> Self {
        let app_id = config.local_source.app_id.trim();
        Self {
            cache_dir: config.cache.directory.clone(),
            max_concurrent: config.download.max_concurrent,
            timeout: Duration::from_secs(config.download.timeout_secs),
            local_source: LocalSourceAppConfig {
                enabled: config.local_source.enabled,
                workshop_app_id: (!app_id.is_empty()).then(|| app_id.to_string()),
                directories: config.local_source.directories.clone(),
                min_quality_bytes: config.local_source.min_quality_bytes,
            },
            desktop_command: config.desktop.command.clone(),
        }
    }

    /// Set the maximum number of simultaneous transfers.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the local-source quality threshold.
    pub fn with_min_quality_bytes(mut self, bytes: u64) -> Self {
        self.local_source.min_quality_bytes = bytes;
        self
    }

    /// Disable local-source lookup entirely.
    pub fn without_local_source(mut self) -> Self {
        self.local_source.enabled = false;
        self
    }

    /// Search only the given roots, skipping Steam detection.
    pub fn with_local_source_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.local_source.enabled = true;
        self.local_source.workshop_app_id = None;
        self.local_source.directories = dirs;
        self
    }

    /// Set the desktop command template.
    pub fn with_desktop_command(mut self, command: impl Into<String>) -> Self {
        self.desktop_command = Some(command.into());
        self
    }

    /// Coordinator tunables derived from this config.
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig::default()
            .with_max_concurrent(self.max_concurrent)
            .with_min_quality_bytes(self.local_source.min_quality_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_defaults() {
        let config = AppConfig::new("/tmp/cache");
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/cache"));
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert!(config.local_source.enabled);
        assert_eq!(config.local_source.min_quality_bytes, 2_000_000);
    }

    #[test]
    fn test_from_config_file() {
        let mut file = ConfigFile::default();
        file.cache.directory = PathBuf::from("/data/walls");
        file.download.max_concurrent = 2;
        file.download.timeout_secs = 30;
        file.local_source.app_id = String::new();
        file.local_source.min_quality_bytes = 1_000;
        file.desktop.command = Some("setbg {path}".to_string());

        let config = AppConfig::from_config_file(&file);
        assert_eq!(config.cache_dir, PathBuf::from("/data/walls"));
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.local_source.workshop_app_id, None);
        assert_eq!(config.local_source.min_quality_bytes, 1_000);
        assert_eq!(config.desktop_command.as_deref(), Some("setbg {path}"));
    }

    #[test]
    fn test_builders() {
        let config = AppConfig::new("/c")
            .with_max_concurrent(0)
            .with_min_quality_bytes(5)
            .with_local_source_dirs(vec![PathBuf::from("/src")]);
        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.local_source.workshop_app_id, None);

        let coordinator = config.coordinator_config();
        assert_eq!(coordinator.max_concurrent, 1);
        assert_eq!(coordinator.min_quality_bytes, 5);

        assert!(!config.without_local_source().local_source.enabled);
    }
}
