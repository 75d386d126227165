use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the `questcast-bridge` crate.
///
/// Covers every failure mode of an external tool invocation: the binary
/// is missing, the call ran past its deadline, the tool exited non-zero,
/// or it exited cleanly but printed a failure marker. `questcast-core`
/// maps these into user-facing variants.
#[derive(Debug, Error)]
pub enum Error {
    // ── Tool resolution ─────────────────────────────────────────────
    /// The executable could not be spawned because it does not exist.
    #[error("{tool} not found (looked for {})", .path.display())]
    ToolNotFound { tool: String, path: PathBuf },

    // ── Invocation ──────────────────────────────────────────────────
    /// The call did not finish within its deadline. The child was killed.
    #[error("`{command}` timed out after {timeout_ms}ms")]
    Timeout { command: String, timeout_ms: u64 },

    /// The tool exited with a non-zero status (or was killed by a signal).
    #[error("`{command}` exited with {}: {output}", status_text(.status))]
    ExitStatus {
        command: String,
        status: Option<i32>,
        output: String,
    },

    /// The tool exited cleanly but reported failure in its output.
    #[error("`{command}` failed: {output}")]
    Rejected { command: String, output: String },

    /// Any other spawn or pipe failure.
    #[error("I/O error running {tool}: {source}")]
    Io {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn is_tool_not_found(&self) -> bool {
        matches!(self, Self::ToolNotFound { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// The raw text the tool printed, when there is any.
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            Self::ExitStatus { output, .. } | Self::Rejected { output, .. } => Some(output),
            _ => None,
        }
    }
}

#[allow(clippy::ref_option)]
fn status_text(status: &Option<i32>) -> String {
    status.map_or_else(|| "a signal".to_owned(), |c| format!("status {c}"))
}
