//! `wallstash config` - inspect and edit `~/.wallstash/config.ini` key by key.

use clap::Subcommand;
use wallstash::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one value, e.g. `local_source.min_quality_size`
    Get {
        /// Key as section.key
        key: String,

        /// Print the raw value as stored in the file
        #[arg(long)]
        raw: bool,
    },

    /// Validate and store a value, e.g. `download.max_concurrent 8`
    Set {
        /// Key as section.key
        key: String,

        /// New value; sizes accept units such as 2MB or 1.5MiB
        value: String,
    },

    /// Put a key back to its built-in default
    Reset {
        /// Key as section.key
        key: String,
    },

    /// Show every key, marking the ones that differ from the defaults
    List,

    /// Print where the config file lives
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    let path = config_file_path();

    match command {
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::List => {
            let config = ConfigFile::load_from(&path)?;
            print!("{}", render_listing(&config));
        }
        ConfigCommands::Get { key, raw } => {
            let key = parse_key(&key)?;
            let config = ConfigFile::load_from(&path)?;
            let value = if raw {
                key.get(&config)
            } else {
                key.display_value(&config)
            };
            println!("{}", shown(&value));
        }
        ConfigCommands::Set { key, value } => {
            let key = parse_key(&key)?;
            let mut config = ConfigFile::load_from(&path)?;
            key.set(&mut config, &value)?;
            config.save_to(&path)?;
            println!("{} = {}", key, key.display_value(&config));
        }
        ConfigCommands::Reset { key } => {
            let key = parse_key(&key)?;
            let mut config = ConfigFile::load_from(&path)?;
            key.reset(&mut config)?;
            config.save_to(&path)?;
            println!("{} reset to {}", key, shown(&key.display_value(&config)));
        }
    }
    Ok(())
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown key '{}'. Run 'wallstash config list' for the available keys.",
            key
        ))
    })
}

fn shown(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}

/// One `[section]` block per section; `*` marks overridden keys.
fn render_listing(config: &ConfigFile) -> String {
    let width = ConfigKey::all()
        .iter()
        .map(|k| k.key_name().len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let mut section = "";
    for key in ConfigKey::all() {
        if key.section() != section {
            if !section.is_empty() {
                out.push('\n');
            }
            section = key.section();
            out.push_str(&format!("[{}]\n", section));
        }
        let marker = if key.is_default(config) { ' ' } else { '*' };
        out.push_str(&format!(
            "{} {:<width$} = {}    # {}\n",
            marker,
            key.key_name(),
            shown(&key.display_value(config)),
            key.description(),
            width = width
        ));
    }
    out
}
