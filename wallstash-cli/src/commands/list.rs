//! List command - show everything in the local cache.

use wallstash::config::format_size;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the list command.
pub fn run(json: bool, verbose: bool) -> Result<(), CliError> {
    let runner = CliRunner::new(verbose)?;
    runner.log_startup("list");
    let app = runner.start_app()?;

    let mut entries = app.block_on(app.list())??;
    entries.sort_by(|a, b| a.reference.cmp(&b.reference));

    if json {
        let out = serde_json::to_string_pretty(&entries)
            .map_err(|e| CliError::Config(format!("Failed to encode listing: {}", e)))?;
        println!("{}", out);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Cache is empty.");
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{:<12} {:<32} {:>10}  {}",
            entry.reference,
            entry.title,
            format_size(entry.size_bytes),
            entry.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
    println!();
    println!("{} items, {}", entries.len(), format_size(total));
    Ok(())
}
