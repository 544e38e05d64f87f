//! Desktop integration.
//!
//! A [`DesktopSink`] takes a cached file and applies it, typically as the
//! desktop background. The library never interprets the result: success or
//! the sink's error is handed back to the caller unchanged.

use std::path::Path;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::download::BoxFuture;

/// Placeholder replaced by the file path in command templates.
pub const PATH_PLACEHOLDER: &str = "{path}";

/// Errors from a desktop sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The command template could not be used.
    #[error("Invalid desktop command: {0}")]
    InvalidTemplate(String),

    /// The command could not be started.
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran but reported failure.
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Applies a local file to the desktop.
pub trait DesktopSink: Send + Sync {
    fn apply<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<(), SinkError>>;
}

/// Runs an external command with the file path substituted in.
///
/// # Example
///
/// ```
/// use wallstash::desktop::CommandSink;
///
/// let sink = CommandSink::from_template("feh --bg-fill {path}").unwrap();
/// assert_eq!(sink.program(), "feh");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSink {
    program: String,
    args: Vec<String>,
}

impl CommandSink {
    /// Build a sink from a command line such as `feh --bg-fill {path}`.
    ///
    /// Arguments are split on whitespace; double or single quotes group an
    /// argument containing spaces. If no argument mentions `{path}`, the
    /// path is appended as the last argument.
    pub fn from_template(template: &str) -> Result<Self, SinkError> {
        let mut words = split_command(template)?.into_iter();
        let program = words
            .next()
            .ok_or_else(|| SinkError::InvalidTemplate("empty command".to_string()))?;
        let mut args: Vec<String> = words.collect();
        if !program.contains(PATH_PLACEHOLDER) && !args.iter().any(|a| a.contains(PATH_PLACEHOLDER)) {
            args.push(PATH_PLACEHOLDER.to_string());
        }
        Ok(Self { program, args })
    }

    /// The platform's usual way of setting the desktop background, if known.
    pub fn platform_default() -> Option<Self> {
        platform_default_template().and_then(|t| Self::from_template(t).ok())
    }

    /// Program that will be run.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with `{path}` substituted.
    pub fn args_for(&self, path: &Path) -> Vec<String> {
        let path = path.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(PATH_PLACEHOLDER, &path))
            .collect()
    }

    async fn run(&self, path: &Path) -> Result<(), SinkError> {
        let args = self.args_for(path);
        debug!(program = %self.program, args = ?args, "Running desktop command");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| SinkError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SinkError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        info!(path = %path.display(), "Applied to desktop");
        Ok(())
    }
}

impl DesktopSink for CommandSink {
    fn apply<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(self.run(path))
    }
}

#[cfg(target_os = "macos")]
fn platform_default_template() -> Option<&'static str> {
    Some(
        r#"osascript -e "tell application \"System Events\" to tell every desktop to set picture to \"{path}\"""#,
    )
}

#[cfg(all(unix, not(target_os = "macos")))]
fn platform_default_template() -> Option<&'static str> {
    Some("gsettings set org.gnome.desktop.background picture-uri file://{path}")
}

#[cfg(not(unix))]
fn platform_default_template() -> Option<&'static str> {
    None
}

/// Split a command line into words, honouring quotes and `\"` escapes.
fn split_command(line: &str) -> Result<Vec<String>, SinkError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') => match chars.next() {
                Some(next) => current.push(next),
                None => current.push('\\'),
            },
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(SinkError::InvalidTemplate(format!("unterminated {} quote", q)));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
