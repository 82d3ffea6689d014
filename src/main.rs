//! shellcache - offline cache for an installable web application shell
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use shellcache::cli::{Cli, Commands};
use shellcache::config::ConfigManager;
use shellcache::error::ShellcacheResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ShellcacheResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // Config command runs before loading so `init --force` can repair a bad file
    if let Commands::Config(args) = cli.command {
        init_logging(cli.verbose, false);
        return shellcache::cli::commands::config(args, &config_manager).await;
    }

    let loaded = config_manager.load().await;
    let json_logs = matches!(&loaded, Ok(config) if config.general.log_format == "json");
    init_logging(cli.verbose, json_logs);
    let config = loaded?;

    match cli.command {
        Commands::Config(_) => unreachable!("Config handled above"),
        Commands::Install(args) => shellcache::cli::commands::install(args, &config).await,
        Commands::SkipWaiting => shellcache::cli::commands::skip_waiting(&config).await,
        Commands::Fetch(args) => shellcache::cli::commands::fetch(args, &config).await,
        Commands::Status => shellcache::cli::commands::status(&config, &config_manager).await,
        Commands::List(args) => shellcache::cli::commands::list(args, &config).await,
    }
}

/// Logging to stderr: 0 = warn, 1 = info, 2+ = debug
fn init_logging(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => EnvFilter::new("shellcache=warn"),
        1 => EnvFilter::new("shellcache=info"),
        _ => EnvFilter::new("shellcache=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
