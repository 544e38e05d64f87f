//! Progress display shared by `get` and `apply`.

use std::future::Future;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;
use wallstash::app::WallstashApp;
use wallstash::download::TransferState;

use crate::error::CliError;

/// Bar length; progress fractions are scaled to this.
const BAR_SCALE: u64 = 1000;

/// Build the download progress bar.
pub fn progress_bar(title: &str) -> ProgressBar {
    let bar = ProgressBar::new(BAR_SCALE);
    let style = ProgressStyle::with_template(
        "{spinner:.green} {msg:30!} [{elapsed_precise}] {bar:40.cyan/blue} {percent:>3}%",
    )
    .map(|style| style.progress_chars("━━╌"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar.set_message(title.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Scale a progress fraction to a bar position.
pub fn bar_position(progress: f64) -> u64 {
    (progress.clamp(0.0, 1.0) * BAR_SCALE as f64).round() as u64
}

/// Install a Ctrl+C handler that cancels `reference`.
pub fn cancel_on_interrupt(app: &WallstashApp, reference: &str) -> Result<(), CliError> {
    let coordinator = app.coordinator();
    let reference = reference.to_string();
    ctrlc::set_handler(move || {
        if coordinator.cancel(&reference) {
            eprintln!();
            eprintln!("Cancelling download of {}...", reference);
        }
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))
}

/// Drive `work` to completion while mirroring the tracked state of
/// `reference` onto a progress bar.
pub async fn with_progress<F, T>(app: &WallstashApp, reference: &str, title: &str, work: F) -> T
where
    F: Future<Output = T>,
{
    let mut updates = app.tracker().subscribe();
    let bar = progress_bar(title);
    tokio::pin!(work);

    let output = loop {
        tokio::select! {
            output = &mut work => break output,
            update = updates.recv() => match update {
                Ok(update) if update.reference == reference => {
                    if let TransferState::Downloading { progress } = update.state {
                        bar.set_position(bar_position(progress));
                    }
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break (&mut work).await,
            },
        }
    };

    bar.finish_and_clear();
    output
}
