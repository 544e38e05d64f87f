//! Wallstash command line.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use commands::get::GetArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "wallstash")]
#[command(version = wallstash::VERSION)]
#[command(about = "Download wallpapers once and keep them in a local cache", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file with detected defaults
    Init,

    /// Make an item available in the local cache
    Get {
        /// Content reference (e.g., workshop item id)
        reference: String,

        /// Remote URL to fetch from if no local copy exists
        url: String,

        /// Display title used in the cached filename
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Fetch an item if needed and set it as the desktop wallpaper
    Apply {
        /// Content reference (e.g., workshop item id)
        reference: String,

        /// Remote URL to fetch from if no local copy exists
        url: String,

        /// Display title used in the cached filename
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List cached items
    List {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove a cached item
    Remove {
        /// Content reference to remove
        reference: String,
    },

    /// Manage the cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Get {
            reference,
            url,
            name,
        } => commands::get::run(
            GetArgs {
                reference,
                url,
                name,
            },
            cli.verbose,
        ),
        Commands::Apply {
            reference,
            url,
            name,
        } => commands::apply::run(
            GetArgs {
                reference,
                url,
                name,
            },
            cli.verbose,
        ),
        Commands::List { json } => commands::list::run(json, cli.verbose),
        Commands::Remove { reference } => commands::remove::run(&reference, cli.verbose),
        Commands::Cache { action } => commands::cache::run(action, cli.verbose),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        report(&e);
        std::process::exit(e.exit_code());
    }
}

fn report(error: &CliError) {
    eprintln!("{} {}", console::style("Error:").red().bold(), error);
}
