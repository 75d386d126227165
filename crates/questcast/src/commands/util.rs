//! Shared helpers for command handlers.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use questcast_bridge::Adb;
use questcast_core::{Controller, DeviceIdentity, PollHealth};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Parse a `--target` value: `host:port` for Wi-Fi, anything else is a
/// USB serial.
pub fn parse_target(raw: &str) -> Result<DeviceIdentity, CliError> {
    let raw = raw.trim();
    if raw.is_empty() || raw.contains(char::is_whitespace) {
        return Err(CliError::Validation {
            field: "--target".into(),
            reason: format!("expected a serial or host:port, got '{raw}'"),
        });
    }
    Ok(DeviceIdentity::from_address(raw))
}

/// Scheduler polls fold a missing tool into health rather than failing;
/// one-shot commands turn it back into an error.
pub fn ensure_tool_present(ctrl: &Controller<Adb>) -> Result<(), CliError> {
    let health = ctrl.health().borrow().clone();
    match health {
        PollHealth::ToolMissing { tool, path } => Err(CliError::ToolMissing {
            tool,
            path: path.display().to_string(),
            hint: questcast_core::install_hint(),
        }),
        PollHealth::Ok | PollHealth::TimingOut { .. } => Ok(()),
    }
}

/// Spinner on stderr for interactive table output; hidden otherwise.
pub fn spinner(global: &GlobalOpts, message: String) -> ProgressBar {
    if global.quiet || global.output != OutputFormat::Table {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
