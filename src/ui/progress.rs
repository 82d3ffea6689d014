//! Install progress with CI fallback

use super::context::UiContext;
use crate::worker::PopulateOutcome;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress over the manifest during install
///
/// An indicatif bar in interactive mode; one line per resource otherwise.
pub struct InstallProgress {
    bar: Option<ProgressBar>,
}

impl InstallProgress {
    pub fn new(ctx: &UiContext, version: &str, total: usize) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(total as u64);
            if let Ok(bar_style) = ProgressStyle::default_bar()
                .template("  {spinner:.cyan} Caching {prefix}  {bar:20.cyan/dim} {pos}/{len} {msg:.dim}")
            {
                bar.set_style(bar_style.progress_chars("━╸─"));
            }
            bar.set_prefix(version.to_string());
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            Some(bar)
        } else {
            println!("Caching {} ({} resources)...", version, total);
            None
        };
        Self { bar }
    }

    /// Record one finished resource
    pub fn on_outcome(&self, outcome: &PopulateOutcome) {
        match &self.bar {
            Some(bar) => {
                bar.inc(1);
                bar.set_message(short(&describe(outcome)));
            }
            None => match outcome {
                PopulateOutcome::Cached { key } => {
                    println!("  {} {}", style("[OK]").green(), key)
                }
                PopulateOutcome::Failed { url, reason } => {
                    println!("  {} {}: {}", style("[WARN]").yellow(), url, reason)
                }
            },
        }
    }

    /// Finish and clear the bar
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

fn describe(outcome: &PopulateOutcome) -> String {
    match outcome {
        PopulateOutcome::Cached { key } => key.clone(),
        PopulateOutcome::Failed { url, reason } => format!("{} ({})", url, reason),
    }
}

fn short(message: &str) -> String {
    if message.chars().count() > 60 {
        let head: String = message.chars().take(57).collect();
        format!("{}...", head)
    } else {
        message.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_progress_non_interactive() {
        let ctx = UiContext::non_interactive();
        let progress = InstallProgress::new(&ctx, "router-cache-v5", 2);
        progress.on_outcome(&PopulateOutcome::Cached {
            key: "./index.html".to_string(),
        });
        progress.on_outcome(&PopulateOutcome::Failed {
            url: "./app.js".to_string(),
            reason: "HTTP 404 Not Found".to_string(),
        });
        progress.finish();
    }

    #[test]
    fn long_messages_are_shortened() {
        let long = "x".repeat(80);
        assert_eq!(short(&long).chars().count(), 60);
        assert_eq!(short("./app.js"), "./app.js");
    }
}
