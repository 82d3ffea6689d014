//! Skip-waiting command - activate the waiting version

use super::install::record_activation;
use super::Workspace;
use crate::config::Config;
use crate::error::ShellcacheResult;
use crate::ui::{self, UiContext};
use crate::worker::ControlMessage;

/// Execute the skip-waiting command
pub async fn execute(config: &Config) -> ShellcacheResult<()> {
    let ctx = UiContext::detect();
    let workspace = Workspace::open(config)?;
    let mut registration = workspace.registration(config.network()?).await?;

    let report = registration.post_message(ControlMessage::SkipWaiting).await?;
    record_activation(&config.journal(), &report).await;
    workspace.save(&registration).await?;

    for purged in &report.purged {
        ui::step_info(&ctx, &format!("Deleted stale cache {}", purged));
    }
    ui::outro_success(&ctx, &format!("{} is active", report.version));
    Ok(())
}
