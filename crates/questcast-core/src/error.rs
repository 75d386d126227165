// ── Core error types ──
//
// User-facing errors from questcast-core. Consumers never see raw exit
// statuses for the poll path: a failed listing becomes an empty snapshot.
// The `From<questcast_bridge::Error>` impl translates invocation errors
// for the operations that do surface them (upgrade, disconnect, cast).

use std::path::PathBuf;

use thiserror::Error;

use crate::model::DeviceState;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Tooling ──────────────────────────────────────────────────────
    #[error("{tool} is not installed (looked for {})", .path.display())]
    ToolNotFound { tool: String, path: PathBuf },

    #[error("`{command}` timed out after {timeout_ms}ms")]
    Timeout { command: String, timeout_ms: u64 },

    // ── Device state ─────────────────────────────────────────────────
    #[error("No headset detected")]
    NoDevice,

    #[error("Headset detected but debugging access has not been approved")]
    Unauthorized,

    #[error("Cannot {operation} while the headset is {state}")]
    InvalidState {
        operation: &'static str,
        state: DeviceState,
    },

    // ── Operations ───────────────────────────────────────────────────
    #[error("Wireless connection failed: {message}")]
    Upgrade { message: String },

    #[error("Could not start mirroring: {message}")]
    Mirror { message: String },

    #[error("Device bridge error: {message}")]
    Bridge { message: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Status scheduler is not running")]
    Disconnected,
}

impl CoreError {
    pub fn is_tool_not_found(&self) -> bool {
        matches!(self, Self::ToolNotFound { .. })
    }
}

// ── Conversion from invocation errors ────────────────────────────────

impl From<questcast_bridge::Error> for CoreError {
    fn from(err: questcast_bridge::Error) -> Self {
        match err {
            questcast_bridge::Error::ToolNotFound { tool, path } => {
                CoreError::ToolNotFound { tool, path }
            }
            questcast_bridge::Error::Timeout {
                command,
                timeout_ms,
            } => CoreError::Timeout {
                command,
                timeout_ms,
            },
            questcast_bridge::Error::ExitStatus { output, .. }
            | questcast_bridge::Error::Rejected { output, .. } => {
                CoreError::Bridge { message: output }
            }
            questcast_bridge::Error::Io { tool, source } => CoreError::Bridge {
                message: format!("{tool}: {source}"),
            },
        }
    }
}
