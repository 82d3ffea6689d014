//! Install command - populate a cache version and activate it

use super::Workspace;
use crate::cli::args::InstallArgs;
use crate::config::Config;
use crate::error::ShellcacheResult;
use crate::journal::{Journal, ACTIVATE_COMPLETED, INSTALL_COMPLETED, INSTALL_FAILED};
use crate::ui::{self, InstallProgress, UiContext};
use crate::worker::{ActivationReport, InstallReport, RegisterOutcome};

/// Execute the install command
pub async fn execute(args: InstallArgs, config: &Config) -> ShellcacheResult<()> {
    let ctx = UiContext::detect();
    let workspace = Workspace::open(config)?;
    let journal = config.journal();
    let network = config.network()?;

    let tag = args.tag.unwrap_or_else(|| config.cache.version.clone());
    let controller = workspace
        .controller(&tag, network.clone())
        .with_skip_waiting(config.cache.skip_waiting && !args.wait);
    let version = controller.version().clone();

    ui::intro(&ctx, &format!("Installing {}", version));

    let mut registration = workspace.registration(network).await?;
    let progress = InstallProgress::new(&ctx, &version.cache_name(), controller.manifest().len());
    let outcome = registration
        .register_with_progress(controller, &|outcome| progress.on_outcome(outcome))
        .await;
    progress.finish();

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            journal
                .record(
                    INSTALL_FAILED,
                    &serde_json::json!({ "version": version.tag(), "error": e.to_string() }),
                )
                .await;
            if e.keeps_previous_version() {
                if let Some(active) = registration.active_version() {
                    ui::step_warn(&ctx, &format!("{} remains active", active));
                }
            }
            return Err(e);
        }
    };

    match outcome {
        RegisterOutcome::Unchanged => {
            ui::outro_success(&ctx, &format!("{} is already active", version));
            return Ok(());
        }
        RegisterOutcome::Waiting(report) => {
            record_install(&journal, &report).await;
            summarize(&ctx, &report);
            ui::outro_warn(
                &ctx,
                &format!("{} is waiting; run: shellcache skip-waiting", version),
            );
        }
        RegisterOutcome::Activated(report, activation) => {
            record_install(&journal, &report).await;
            record_activation(&journal, &activation).await;
            summarize(&ctx, &report);
            for purged in &activation.purged {
                ui::step_info(&ctx, &format!("Deleted stale cache {}", purged));
            }
            ui::outro_success(&ctx, &format!("{} is active", version));
        }
    }

    workspace.save(&registration).await
}

fn summarize(ctx: &UiContext, report: &InstallReport) {
    ui::step_ok(ctx, &format!("Cached {} resource(s)", report.cached.len()));
    for (url, reason) in &report.failed {
        ui::step_warn_hint(ctx, &format!("Skipped {}", url), reason);
    }
}

async fn record_install(journal: &Journal, report: &InstallReport) {
    journal
        .record(
            INSTALL_COMPLETED,
            &serde_json::json!({
                "version": report.version.tag(),
                "cached": report.cached.len(),
                "failed": report.failed.iter().map(|(url, _)| url).collect::<Vec<_>>(),
            }),
        )
        .await;
}

pub(crate) async fn record_activation(journal: &Journal, report: &ActivationReport) {
    journal
        .record(
            ACTIVATE_COMPLETED,
            &serde_json::json!({
                "version": report.version.tag(),
                "purged": report.purged,
                "claimed": report.claimed,
            }),
        )
        .await;
}
