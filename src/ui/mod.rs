//! Terminal output for the CLI
//!
//! Styled `cliclack` output and an `indicatif` install bar on a TTY,
//! plain `[OK]`/`[WARN]` lines in CI and when piped.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    intro, key_value, key_value_status, outro_success, outro_warn, remark, section, step_info,
    step_ok, step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::InstallProgress;
