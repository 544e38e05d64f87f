//! Shared setup for commands that touch the cache.

use wallstash::app::{AppConfig, WallstashApp};
use wallstash::config::ConfigFile;
use wallstash::logging::{init_logging, LogGuard, LoggingConfig};

use crate::error::CliError;

/// Loaded configuration plus initialized logging.
pub struct CliRunner {
    config: ConfigFile,
    _log_guard: LogGuard,
}

impl CliRunner {
    /// Load the config file and install the tracing subscriber.
    pub fn new(verbose: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let mut logging = LoggingConfig::from(&config.logging)
            .with_ansi(console::Term::stderr().features().colors_supported());
        if verbose {
            logging = logging.with_level("debug");
        }
        let log_guard = init_logging(&logging)?;

        Ok(Self {
            config,
            _log_guard: log_guard,
        })
    }

    /// Loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log the command being run.
    pub fn log_startup(&self, command: &str) {
        tracing::debug!(
            version = wallstash::VERSION,
            command,
            cache_dir = %self.config.cache.directory.display(),
            "wallstash starting"
        );
    }

    /// Start the application on its own runtime.
    pub fn start_app(&self) -> Result<WallstashApp, CliError> {
        let app = WallstashApp::start_sync(AppConfig::from_config_file(&self.config))?;
        Ok(app)
    }
}
