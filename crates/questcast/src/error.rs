//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use questcast_config::ConfigError;
use questcast_core::{CoreError, DeviceState};

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NO_DEVICE: i32 = 4;
    pub const UNAUTHORIZED: i32 = 5;
    pub const TOOL_MISSING: i32 = 6;
    pub const UPGRADE_FAILED: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const CONFIG: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Tooling ──────────────────────────────────────────────────────
    #[error("{tool} is not installed (looked for {path})")]
    #[diagnostic(
        code(questcast::tool_missing),
        help(
            "{hint}\n\
             Or point questcast at it with --{tool} <PATH> or [tools] {tool} in the config file."
        )
    )]
    ToolMissing {
        tool: String,
        path: String,
        hint: &'static str,
    },

    #[error("`{command}` did not finish within {timeout_ms}ms")]
    #[diagnostic(
        code(questcast::timeout),
        help("The adb server may be restarting. Retry, or raise adb_timeout_ms in the config file.")
    )]
    Timeout { command: String, timeout_ms: u64 },

    #[error("adb failed: {message}")]
    #[diagnostic(code(questcast::bridge))]
    Bridge { message: String },

    // ── Device state ─────────────────────────────────────────────────
    #[error("No headset detected")]
    #[diagnostic(
        code(questcast::no_device),
        help(
            "Make sure the headset is on, developer mode is enabled, and the USB cable is connected.\n\
             Run: questcast devices"
        )
    )]
    NoDevice,

    #[error("Headset detected but USB debugging has not been approved")]
    #[diagnostic(
        code(questcast::unauthorized),
        help("Put on the headset and select 'Always Allow' in the USB debugging prompt.")
    )]
    Unauthorized,

    #[error("Cannot {operation} while the headset is {state}")]
    #[diagnostic(code(questcast::invalid_state), help("Run: questcast status"))]
    InvalidState {
        operation: &'static str,
        state: DeviceState,
    },

    // ── Operations ───────────────────────────────────────────────────
    #[error("Wireless connection failed: {message}")]
    #[diagnostic(
        code(questcast::upgrade_failed),
        help(
            "Make sure the headset and this computer are on the same Wi-Fi network,\n\
             and that the wireless port is not blocked by a firewall."
        )
    )]
    UpgradeFailed { message: String },

    #[error("Could not start mirroring: {message}")]
    #[diagnostic(code(questcast::mirror_failed))]
    MirrorFailed { message: String },

    #[error("The status scheduler stopped unexpectedly")]
    #[diagnostic(code(questcast::scheduler))]
    Scheduler,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(questcast::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(questcast::config),
        help("Check the config file, or run: questcast config init --force")
    )]
    Config(Box<ConfigError>),

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(questcast::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML serialization failed: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoDevice => exit_code::NO_DEVICE,
            Self::Unauthorized => exit_code::UNAUTHORIZED,
            Self::ToolMissing { .. } => exit_code::TOOL_MISSING,
            Self::UpgradeFailed { .. } => exit_code::UPGRADE_FAILED,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Config(_) | Self::ConfigExists { .. } => exit_code::CONFIG,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ToolNotFound { tool, path } => CliError::ToolMissing {
                tool,
                path: path.display().to_string(),
                hint: questcast_core::install_hint(),
            },
            CoreError::Timeout {
                command,
                timeout_ms,
            } => CliError::Timeout {
                command,
                timeout_ms,
            },
            CoreError::NoDevice => CliError::NoDevice,
            CoreError::Unauthorized => CliError::Unauthorized,
            // Upgrading or disconnecting with nothing attached reads better
            // as "no headset" than as a state name.
            CoreError::InvalidState {
                state: DeviceState::Absent,
                ..
            } => CliError::NoDevice,
            CoreError::InvalidState {
                state: DeviceState::Unauthorized,
                ..
            } => CliError::Unauthorized,
            CoreError::InvalidState { operation, state } => {
                CliError::InvalidState { operation, state }
            }
            CoreError::Upgrade { message } => CliError::UpgradeFailed { message },
            CoreError::Mirror { message } => CliError::MirrorFailed { message },
            CoreError::Bridge { message } => CliError::Bridge { message },
            CoreError::Disconnected => CliError::Scheduler,
        }
    }
}

impl From<questcast_bridge::Error> for CliError {
    fn from(err: questcast_bridge::Error) -> Self {
        CoreError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_keep_their_exit_codes() {
        let cases = [
            (CoreError::NoDevice, exit_code::NO_DEVICE),
            (CoreError::Unauthorized, exit_code::UNAUTHORIZED),
            (
                CoreError::ToolNotFound {
                    tool: "adb".into(),
                    path: "adb".into(),
                },
                exit_code::TOOL_MISSING,
            ),
            (
                CoreError::Upgrade {
                    message: "failed to connect".into(),
                },
                exit_code::UPGRADE_FAILED,
            ),
            (
                CoreError::Timeout {
                    command: "adb devices".into(),
                    timeout_ms: 4000,
                },
                exit_code::TIMEOUT,
            ),
            (
                CoreError::InvalidState {
                    operation: "connect wirelessly",
                    state: DeviceState::Absent,
                },
                exit_code::NO_DEVICE,
            ),
            (
                CoreError::InvalidState {
                    operation: "connect wirelessly",
                    state: DeviceState::ReadyWireless,
                },
                exit_code::GENERAL,
            ),
        ];
        for (core, code) in cases {
            let text = core.to_string();
            assert_eq!(CliError::from(core).exit_code(), code, "{text}");
        }
    }
}
