//! Status command - show the registration and cache namespaces

use super::Workspace;
use crate::config::{Config, ConfigManager};
use crate::error::ShellcacheResult;
use crate::ui::{self, UiContext};

/// Execute the status command
pub async fn execute(config: &Config, manager: &ConfigManager) -> ShellcacheResult<()> {
    let ctx = UiContext::detect();
    let workspace = Workspace::open(config)?;
    let record = workspace.record().await?;
    let configured = config.version();

    ui::intro(&ctx, "shellcache status");

    ui::section(&ctx, "Registration");
    ui::key_value(&ctx, "config", &manager.path().display().to_string());
    ui::key_value(&ctx, "origin", workspace.scope().base().as_str());
    ui::key_value(&ctx, "configured", &configured.to_string());
    match &record.active {
        Some(tag) => ui::key_value_status(
            &ctx,
            "active",
            &config.version_tagged(tag).to_string(),
            tag == configured.tag(),
        ),
        None => ui::key_value_status(&ctx, "active", "none", false),
    }
    if let Some(tag) = &record.waiting {
        ui::key_value_status(&ctx, "waiting", &config.version_tagged(tag).to_string(), false);
    }
    ui::key_value(
        &ctx,
        "updated",
        &record.updated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );

    ui::section(&ctx, "Caches");
    let names: Vec<String> = workspace
        .storage()
        .names()
        .await?
        .into_iter()
        .filter(|name| configured.owns(name))
        .collect();
    if names.is_empty() {
        ui::step_info(&ctx, "No caches installed");
    }
    let active_name = record
        .active
        .as_deref()
        .map(|tag| config.version_tagged(tag).cache_name());
    for name in names {
        let entries = workspace.storage().open(&name).await?.keys().await?.len();
        let detail = format!("{} entries", entries);
        if active_name.as_deref() == Some(name.as_str()) {
            ui::step_ok(&ctx, &format!("{} (active, {})", name, detail));
        } else {
            ui::step_warn(&ctx, &format!("{} ({})", name, detail));
        }
    }

    if record.active.is_none() {
        ui::remark(&ctx, "Run: shellcache install");
    }
    Ok(())
}
