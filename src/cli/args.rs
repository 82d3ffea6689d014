//! CLI argument definitions using clap derive

use crate::http::Method;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// shellcache - offline cache for an installable web application shell
///
/// Installs a versioned snapshot of the shell into a local cache and
/// answers requests cache-first or network-first with an offline fallback.
#[derive(Parser, Debug)]
#[command(name = "shellcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SHELLCACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the configured cache version and activate it
    Install(InstallArgs),

    /// Activate the version waiting to take control
    SkipWaiting,

    /// Run one request through the active cache
    Fetch(FetchArgs),

    /// Show the registration and cache namespaces
    Status,

    /// List entries of the active cache
    List(ListArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the install command
#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// Install this version tag instead of the configured one
    #[arg(long)]
    pub tag: Option<String>,

    /// Stay waiting after install even if the configuration skips waiting
    #[arg(long)]
    pub wait: bool,
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Path or URL, resolved against the origin base URL
    pub path: String,

    /// Request method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: Method,

    /// Simulate lost connectivity
    #[arg(long)]
    pub offline: bool,

    /// Print the status line and headers before the body
    #[arg(short, long)]
    pub include: bool,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for the list command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
