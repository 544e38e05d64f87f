//! Get command - make one item available in the local cache.

use wallstash::config::format_size;
use wallstash::download::DownloadRequest;

use super::transfer::{cancel_on_interrupt, with_progress};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the get command.
pub struct GetArgs {
    pub reference: String,
    pub url: String,
    pub name: Option<String>,
}

impl GetArgs {
    /// Build the download request; the title defaults to the reference.
    pub fn request(&self) -> DownloadRequest {
        let title = self.name.clone().unwrap_or_else(|| self.reference.clone());
        DownloadRequest::new(self.reference.clone(), self.url.clone(), title)
    }
}

/// Run the get command.
pub fn run(args: GetArgs, verbose: bool) -> Result<(), CliError> {
    let runner = CliRunner::new(verbose)?;
    runner.log_startup("get");
    let app = runner.start_app()?;
    cancel_on_interrupt(&app, &args.reference)?;

    let request = args.request();
    let title = request.display_name.clone();
    let result = app.block_on(async {
        let result = with_progress(&app, &args.reference, &title, app.ensure_local(request)).await;
        app.coordinator().cancel_all();
        result
    })?;
    let path = result?;

    let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
    println!(
        "{} {} ({})",
        console::style("Cached").green().bold(),
        path.display(),
        format_size(size)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_title_to_reference() {
        let args = GetArgs {
            reference: "42".to_string(),
            url: "https://host/file.png".to_string(),
            name: None,
        };
        let request = args.request();
        assert_eq!(request.reference, "42");
        assert_eq!(request.display_name, "42");
        assert_eq!(request.source_url, "https://host/file.png");
    }

    #[test]
    fn test_request_uses_given_name() {
        let args = GetArgs {
            reference: "42".to_string(),
            url: "https://host/file.png".to_string(),
            name: Some("Sunset".to_string()),
        };
        assert_eq!(args.request().display_name, "Sunset");
    }
}
