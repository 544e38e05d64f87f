//! CLI error type.

use std::fmt;

use wallstash::app::{AppError, ApplyError};
use wallstash::cache::CacheError;
use wallstash::config::ConfigError;
use wallstash::download::DownloadError;
use wallstash::logging::LoggingError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded, saved or used.
    Config(String),

    /// Logging could not be set up.
    Logging(LoggingError),

    /// The application failed to start.
    Startup(AppError),

    /// A download failed or was cancelled.
    Download(DownloadError),

    /// Applying to the desktop failed.
    Apply(ApplyError),

    /// A cache operation failed.
    Cache(CacheError),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Download(e) if e.is_cancelled() => 130,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(e) => write!(f, "{}", e),
            CliError::Startup(e) => write!(f, "{}", e),
            CliError::Download(e) => write!(f, "{} ({})", e.user_message(), e),
            CliError::Apply(ApplyError::Download(e)) => {
                write!(f, "{} ({})", e.user_message(), e)
            }
            CliError::Apply(e) => write!(f, "Could not apply: {}", e),
            CliError::Cache(e) => write!(f, "Cache error: {}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::Startup(e)
    }
}

impl From<DownloadError> for CliError {
    fn from(e: DownloadError) -> Self {
        CliError::Download(e)
    }
}

impl From<ApplyError> for CliError {
    fn from(e: ApplyError) -> Self {
        CliError::Apply(e)
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}
