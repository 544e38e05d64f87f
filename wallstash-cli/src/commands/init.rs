//! Init command - write a configuration file with detected defaults.

use wallstash::config::{config_file_path, ConfigFile};
use wallstash::local_source::workshop_content_dirs;

use crate::error::CliError;

/// Run the init command.
pub fn run() -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();

    let detected = workshop_content_dirs(&config.local_source.app_id);
    if detected.is_empty() {
        println!("No Steam workshop folders detected for app {}.", config.local_source.app_id);
        println!("Add folders with 'wallstash config set local_source.directories <dirs>'.");
    } else {
        println!("Detected workshop folders:");
        for dir in &detected {
            println!("  {}", dir.display());
        }
    }
    println!();

    config.save()?;

    println!("Configuration file: {}", config_file_path().display());
    println!("Cache directory:    {}", config.cache.directory.display());
    println!();
    println!("Edit this file or use 'wallstash config set' to customize settings.");
    Ok(())
}
