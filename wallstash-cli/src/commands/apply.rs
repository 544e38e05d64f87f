//! Apply command - fetch an item if needed and set it as the wallpaper.

use super::get::GetArgs;
use super::transfer::{cancel_on_interrupt, with_progress};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the apply command.
pub fn run(args: GetArgs, verbose: bool) -> Result<(), CliError> {
    let runner = CliRunner::new(verbose)?;
    runner.log_startup("apply");
    let app = runner.start_app()?;
    let sink = app.desktop_sink()?;
    cancel_on_interrupt(&app, &args.reference)?;

    let request = args.request();
    let title = request.display_name.clone();
    let result = app.block_on(async {
        let result =
            with_progress(&app, &args.reference, &title, app.apply(request, &sink)).await;
        app.coordinator().cancel_all();
        result
    })?;
    let path = result?;

    println!(
        "{} {} via {}",
        console::style("Applied").green().bold(),
        path.display(),
        sink.program()
    );
    Ok(())
}
