//! Configuration file support.
//!
//! Settings live in an INI file at `~/.wallstash/config.ini`:
//!
//! ```ini
//! [cache]
//! directory = ~/.wallstash/cache
//!
//! [download]
//! max_concurrent = 4
//! timeout_secs = 300
//!
//! [local_source]
//! enabled = true
//! app_id = 431960
//! directories = /mnt/games/SteamLibrary/steamapps/workshop/content/431960
//! min_quality_size = 2MB
//!
//! [desktop]
//! command = feh --bg-fill {path}
//!
//! [logging]
//! level = info
//! file = ~/.wallstash/wallstash.log
//! ```
//!
//! A missing file yields defaults. Unknown keys are ignored; a known key
//! with an invalid value is an error.

mod keys;
mod size;

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;
use tracing::debug;

pub use keys::ConfigKey;
pub use size::{format_size, parse_size};

use crate::download::{DEFAULT_MAX_CONCURRENT, DEFAULT_TIMEOUT_SECS};
use crate::local_source::{DEFAULT_MIN_QUALITY_BYTES, WALLPAPER_ENGINE_APP_ID};

/// Name of the per-user configuration directory under `$HOME`.
const CONFIG_DIR_NAME: &str = ".wallstash";

/// Name of the configuration file.
const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors from loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed.
    #[error("Failed to access config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid INI.
    #[error("Failed to parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// A known key has a value that cannot be used.
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// A size value could not be parsed.
    #[error("Invalid size '{value}': {reason}")]
    InvalidSize { value: String, reason: String },

    /// The key is not a known `section.key` name.
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Cache root directory.
    pub directory: PathBuf,
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    /// Maximum simultaneous network transfers.
    pub max_concurrent: usize,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

/// `[local_source]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSourceSettings {
    /// Whether local copies are looked for at all.
    pub enabled: bool,
    /// Steam app whose workshop content folders are probed; empty disables
    /// detection.
    pub app_id: String,
    /// Extra root directories, searched after the detected ones.
    pub directories: Vec<PathBuf>,
    /// Local files must be larger than this to be used.
    pub min_quality_bytes: u64,
}

/// `[desktop]` section.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DesktopSettings {
    /// Command template with `{path}`; `None` uses the platform default.
    pub command: Option<String>,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Default filter directive (overridden by `RUST_LOG`).
    pub level: String,
    /// Optional log file.
    pub file: Option<PathBuf>,
}

/// Contents of `config.ini`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub download: DownloadSettings,
    pub local_source: LocalSourceSettings,
    pub desktop: DesktopSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            cache: CacheSettings {
                directory: config_dir().join("cache"),
            },
            download: DownloadSettings {
                max_concurrent: DEFAULT_MAX_CONCURRENT,
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
            local_source: LocalSourceSettings {
                enabled: true,
                app_id: WALLPAPER_ENGINE_APP_ID.to_string(),
                directories: Vec::new(),
                min_quality_bytes: DEFAULT_MIN_QUALITY_BYTES,
            },
            desktop: DesktopSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
                file: None,
            },
        }
    }
}

impl ConfigFile {
    /// Load from the default location, falling back to defaults if the file
    /// does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`, falling back to defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(config);
        }

        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::Io {
                path: path.to_path_buf(),
                source,
            },
            ini::Error::Parse(parse) => ConfigError::Parse {
                path: path.to_path_buf(),
                message: parse.to_string(),
            },
        })?;

        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|section| section.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }

        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }

        ini.write_to_file(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Saved config file");
        Ok(())
    }
}

/// Per-user configuration directory (`~/.wallstash`).
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Path of the configuration file (`~/.wallstash/config.ini`).
pub fn config_file_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(value: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (value.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with(['/', '\\']) => home.join(&rest[1..]),
        _ => PathBuf::from(value),
    }
}
