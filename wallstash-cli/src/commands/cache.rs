//! Cache management CLI commands.

use clap::Subcommand;
use wallstash::config::format_size;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Delete every cached item
    Clear,
    /// Show cache statistics
    Stats,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction, verbose: bool) -> Result<(), CliError> {
    let runner = CliRunner::new(verbose)?;
    runner.log_startup("cache");
    let app = runner.start_app()?;
    let store = app.store();

    match action {
        CacheAction::Clear => {
            println!("Clearing cache at: {}", store.root().display());
            let result = app.block_on(store.clear())??;
            println!(
                "Deleted {} files, freed {}",
                result.files_deleted,
                format_size(result.bytes_freed)
            );
        }
        CacheAction::Stats => {
            let stats = app.block_on(store.stats())??;
            println!("Cache: {}", store.root().display());
            println!("  Items: {}", stats.entries);
            println!("  Size:  {}", format_size(stats.bytes));
        }
    }
    Ok(())
}
