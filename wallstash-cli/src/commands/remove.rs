//! Remove command - delete one item from the local cache.

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the remove command.
pub fn run(reference: &str, verbose: bool) -> Result<(), CliError> {
    let runner = CliRunner::new(verbose)?;
    runner.log_startup("remove");
    let app = runner.start_app()?;

    if app.block_on(app.delete(reference))?? {
        println!("Removed {}", reference);
    } else {
        println!("{} is not cached", reference);
    }
    Ok(())
}
