//! Config command - show or initialize configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::ConfigManager;
use crate::error::ShellcacheResult;
use crate::ui::{self, UiContext};

/// Execute the config command
///
/// Runs before the configuration is loaded so `init --force` can replace
/// a file that no longer parses.
pub async fn execute(args: ConfigArgs, manager: &ConfigManager) -> ShellcacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => {
            let config = manager.load().await?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => {
            manager.init(force).await?;
            let ctx = UiContext::detect();
            ui::step_ok_detail(
                &ctx,
                "Configuration initialized",
                &manager.path().display().to_string(),
            );
        }
    }

    Ok(())
}
