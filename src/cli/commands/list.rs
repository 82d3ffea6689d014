//! List command - show entries of the active cache

use super::Workspace;
use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::Config;
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

/// One cached response, as listed
#[derive(Debug, Serialize)]
struct EntrySummary {
    key: String,
    status: u16,
    content_type: Option<String>,
    bytes: usize,
}

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config) -> ShellcacheResult<()> {
    let workspace = Workspace::open(config)?;
    let record = workspace.record().await?;
    let tag = record.active.ok_or(ShellcacheError::NoActiveWorker)?;
    let name = config.version_tagged(&tag).cache_name();

    let storage = workspace.storage();
    if !storage.has(&name).await? {
        return Err(ShellcacheError::StoreOpen {
            name,
            reason: "namespace is missing; run: shellcache install".to_string(),
        });
    }
    let store = storage.open(&name).await?;
    let mut entries = vec![];
    for key in store.keys().await? {
        if let Some(response) = store.lookup(&key).await? {
            entries.push(EntrySummary {
                content_type: response.content_type().map(str::to_string),
                status: response.status,
                bytes: response.body.len(),
                key,
            });
        }
    }

    if entries.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, &format!("{} is empty", name));
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&name, &entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.key);
            }
        }
    }

    Ok(())
}

fn print_table(name: &str, entries: &[EntrySummary]) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, name);

    println!(
        "{:<44} {:<8} {:<28} {:>10}",
        style("KEY").bold(),
        style("STATUS").bold(),
        style("CONTENT-TYPE").bold(),
        style("BYTES").bold()
    );
    println!("{}", "-".repeat(93));

    for entry in entries {
        println!(
            "{:<44} {:<8} {:<28} {:>10}",
            entry.key,
            entry.status,
            entry.content_type.as_deref().unwrap_or("-"),
            entry.bytes
        );
    }

    println!();
    println!("{} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
}
