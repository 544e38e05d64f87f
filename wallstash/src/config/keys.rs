//! Typed access to individual configuration settings.
//!
//! Every setting in `config.ini` has a [`ConfigKey`], addressed on the
//! command line as `section.key` (e.g. `download.max_concurrent`). Loading,
//! saving and `config get/set` all go through the same `get`/`set` pair, so
//! validation lives in exactly one place.

use std::fmt;
use std::str::FromStr;

use super::{expand_tilde, format_size, parse_size, ConfigError, ConfigFile};

/// A single configuration setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    CacheDirectory,
    DownloadMaxConcurrent,
    DownloadTimeoutSecs,
    LocalSourceEnabled,
    LocalSourceAppId,
    LocalSourceDirectories,
    LocalSourceMinQualitySize,
    DesktopCommand,
    LoggingLevel,
    LoggingFile,
}

const ALL_KEYS: [ConfigKey; 10] = [
    ConfigKey::CacheDirectory,
    ConfigKey::DownloadMaxConcurrent,
    ConfigKey::DownloadTimeoutSecs,
    ConfigKey::LocalSourceEnabled,
    ConfigKey::LocalSourceAppId,
    ConfigKey::LocalSourceDirectories,
    ConfigKey::LocalSourceMinQualitySize,
    ConfigKey::DesktopCommand,
    ConfigKey::LoggingLevel,
    ConfigKey::LoggingFile,
];

impl ConfigKey {
    /// All keys, grouped by section in file order.
    pub fn all() -> &'static [ConfigKey] {
        &ALL_KEYS
    }

    /// INI section name.
    pub fn section(&self) -> &'static str {
        match self {
            Self::CacheDirectory => "cache",
            Self::DownloadMaxConcurrent | Self::DownloadTimeoutSecs => "download",
            Self::LocalSourceEnabled
            | Self::LocalSourceAppId
            | Self::LocalSourceDirectories
            | Self::LocalSourceMinQualitySize => "local_source",
            Self::DesktopCommand => "desktop",
            Self::LoggingLevel | Self::LoggingFile => "logging",
        }
    }

    /// Key name within the section.
    pub fn key_name(&self) -> &'static str {
        match self {
            Self::CacheDirectory => "directory",
            Self::DownloadMaxConcurrent => "max_concurrent",
            Self::DownloadTimeoutSecs => "timeout_secs",
            Self::LocalSourceEnabled => "enabled",
            Self::LocalSourceAppId => "app_id",
            Self::LocalSourceDirectories => "directories",
            Self::LocalSourceMinQualitySize => "min_quality_size",
            Self::DesktopCommand => "command",
            Self::LoggingLevel => "level",
            Self::LoggingFile => "file",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as it would be written to the file; empty if unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            Self::CacheDirectory => config.cache.directory.display().to_string(),
            Self::DownloadMaxConcurrent => config.download.max_concurrent.to_string(),
            Self::DownloadTimeoutSecs => config.download.timeout_secs.to_string(),
            Self::LocalSourceEnabled => config.local_source.enabled.to_string(),
            Self::LocalSourceAppId => config.local_source.app_id.clone(),
            Self::LocalSourceDirectories => config
                .local_source
                .directories
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            Self::LocalSourceMinQualitySize => config.local_source.min_quality_bytes.to_string(),
            Self::DesktopCommand => config.desktop.command.clone().unwrap_or_default(),
            Self::LoggingLevel => config.logging.level.clone(),
            Self::LoggingFile => config
                .logging
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// One-line description for listings.
    pub fn description(&self) -> &'static str {
        match self {
            Self::CacheDirectory => "where cached wallpapers are stored",
            Self::DownloadMaxConcurrent => "simultaneous network transfers",
            Self::DownloadTimeoutSecs => "per-request timeout in seconds",
            Self::LocalSourceEnabled => "import local copies before downloading",
            Self::LocalSourceAppId => "Steam app whose workshop folder is searched",
            Self::LocalSourceDirectories => "extra folders searched for local copies",
            Self::LocalSourceMinQualitySize => "smallest local file accepted as full quality",
            Self::DesktopCommand => "command used to set the wallpaper, with {path}",
            Self::LoggingLevel => "log level or filter directive",
            Self::LoggingFile => "also write logs to this file",
        }
    }

    /// Current value formatted for people rather than for the file.
    ///
    /// Sizes get a unit; everything else matches [`get`](Self::get).
    pub fn display_value(&self, config: &ConfigFile) -> String {
        match self {
            Self::LocalSourceMinQualitySize => {
                format_size(config.local_source.min_quality_bytes)
            }
            Self::DownloadTimeoutSecs => format!("{}s", config.download.timeout_secs),
            _ => self.get(config),
        }
    }

    /// Whether `config` holds the built-in default for this key.
    pub fn is_default(&self, config: &ConfigFile) -> bool {
        self.get(config) == self.get(&ConfigFile::default())
    }

    /// Restore the built-in default for this key.
    pub fn reset(&self, config: &mut ConfigFile) -> Result<(), ConfigError> {
        let default = self.get(&ConfigFile::default());
        self.set(config, &default)
    }

    /// Validate `value` and store it in `config`.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        };

        match self {
            Self::CacheDirectory => {
                if value.is_empty() {
                    return Err(invalid("must not be empty"));
                }
                config.cache.directory = expand_tilde(value);
            }
            Self::DownloadMaxConcurrent => {
                config.download.max_concurrent = value
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| invalid("expected a positive integer"))?;
            }
            Self::DownloadTimeoutSecs => {
                config.download.timeout_secs = value
                    .parse::<u64>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| invalid("expected a positive number of seconds"))?;
            }
            Self::LocalSourceEnabled => {
                config.local_source.enabled = parse_bool(value)
                    .ok_or_else(|| invalid("expected true or false"))?;
            }
            Self::LocalSourceAppId => {
                if !value.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid("expected a numeric Steam app id"));
                }
                config.local_source.app_id = value.to_string();
            }
            Self::LocalSourceDirectories => {
                config.local_source.directories = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(expand_tilde)
                    .collect();
            }
            Self::LocalSourceMinQualitySize => {
                config.local_source.min_quality_bytes =
                    parse_size(value).map_err(|e| invalid(&e.to_string()))?;
            }
            Self::DesktopCommand => {
                config.desktop.command = non_empty(value).map(str::to_string);
            }
            Self::LoggingLevel => {
                if value.is_empty() {
                    return Err(invalid("must not be empty"));
                }
                config.logging.level = value.to_string();
            }
            Self::LoggingFile => {
                config.logging.file = non_empty(value).map(expand_tilde);
            }
        }
        Ok(())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ALL_KEYS
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for key in ConfigKey::all() {
            let parsed: ConfigKey = key.name().parse().unwrap();
            assert_eq!(parsed, *key);
        }
        assert!("cache.nope".parse::<ConfigKey>().is_err());
    }

    #[test]
    fn test_set_validates() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::DownloadMaxConcurrent.set(&mut config, "0").is_err());
        assert!(ConfigKey::LocalSourceEnabled.set(&mut config, "maybe").is_err());
        assert!(ConfigKey::LocalSourceAppId.set(&mut config, "abc").is_err());

        ConfigKey::LocalSourceEnabled.set(&mut config, "no").unwrap();
        assert!(!config.local_source.enabled);
        ConfigKey::LocalSourceMinQualitySize
            .set(&mut config, "1.5MB")
            .unwrap();
        assert_eq!(config.local_source.min_quality_bytes, 1_500_000);
    }

    #[test]
    fn test_empty_optional_clears() {
        let mut config = ConfigFile::default();
        ConfigKey::DesktopCommand.set(&mut config, "setbg").unwrap();
        assert_eq!(ConfigKey::DesktopCommand.get(&config), "setbg");
        ConfigKey::DesktopCommand.set(&mut config, "  ").unwrap();
        assert_eq!(config.desktop.command, None);
        assert_eq!(ConfigKey::DesktopCommand.get(&config), "");
    }

    #[test]
    fn test_display_value_uses_units() {
        let mut config = ConfigFile::default();
        assert_eq!(
            ConfigKey::LocalSourceMinQualitySize.display_value(&config),
            "2.00 MB"
        );
        assert_eq!(ConfigKey::DownloadTimeoutSecs.display_value(&config), "300s");

        ConfigKey::LocalSourceMinQualitySize
            .set(&mut config, "750kb")
            .unwrap();
        assert_eq!(
            ConfigKey::LocalSourceMinQualitySize.display_value(&config),
            "750.00 KB"
        );
        assert_eq!(ConfigKey::LocalSourceMinQualitySize.get(&config), "750000");
    }

    #[test]
    fn test_reset_restores_default() {
        let mut config = ConfigFile::default();
        for key in ConfigKey::all() {
            assert!(key.is_default(&config), "{}", key);
        }

        ConfigKey::DownloadMaxConcurrent.set(&mut config, "9").unwrap();
        ConfigKey::DesktopCommand.set(&mut config, "setbg {path}").unwrap();
        assert!(!ConfigKey::DownloadMaxConcurrent.is_default(&config));

        ConfigKey::DownloadMaxConcurrent.reset(&mut config).unwrap();
        ConfigKey::DesktopCommand.reset(&mut config).unwrap();
        assert_eq!(config.download.max_concurrent, 4);
        assert_eq!(config.desktop.command, None);
    }

    #[test]
    fn test_every_key_has_description() {
        for key in ConfigKey::all() {
            assert!(!key.description().is_empty(), "{}", key);
        }
    }

    #[test]
    fn test_keys_grouped_by_section() {
        let sections: Vec<&str> = ConfigKey::all().iter().map(|k| k.section()).collect();
        let mut deduped = sections.clone();
        deduped.dedup();
        assert_eq!(deduped, vec!["cache", "download", "local_source", "desktop", "logging"]);
    }
}
