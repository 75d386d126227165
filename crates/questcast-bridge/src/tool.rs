// ── External tool invocation ──
//
// Every call carries its own deadline. A call that runs past it is
// killed (`kill_on_drop`) and reported as `Error::Timeout`; it never
// holds up the caller's next attempt.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::debug;

use crate::error::Error;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Captured result of a finished tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// stdout followed by stderr, trimmed. Tools are inconsistent about
    /// which stream carries their messages.
    pub fn combined(&self) -> String {
        let mut text = self.stdout.trim().to_owned();
        let err = self.stderr.trim();
        if !err.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(err);
        }
        text
    }
}

/// A resolved external executable.
#[derive(Debug, Clone)]
pub struct Tool {
    name: String,
    path: PathBuf,
}

impl Tool {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run to completion with captured output, bounded by `timeout`.
    ///
    /// A non-zero exit is NOT an error here; callers decide what a failed
    /// status means for their command.
    pub async fn run<S: AsRef<str>>(&self, args: &[S], timeout: Duration) -> Result<ToolOutput, Error> {
        let command_line = self.command_line(args);
        debug!(command = %command_line, "running tool");

        let mut cmd = self.command(args);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| self.spawn_error(e))?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| Error::Io {
                tool: self.name.clone(),
                source,
            })?,
            Err(_) => {
                return Err(Error::Timeout {
                    command: command_line,
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
        };

        let result = ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(command = %command_line, status = ?result.status, output = %result.combined(), "tool finished");
        Ok(result)
    }

    /// Run and require a zero exit status.
    pub async fn run_checked<S: AsRef<str>>(
        &self,
        args: &[S],
        timeout: Duration,
    ) -> Result<ToolOutput, Error> {
        let output = self.run(args, timeout).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(Error::ExitStatus {
                command: self.command_line(args),
                status: output.status,
                output: output.combined(),
            })
        }
    }

    /// Spawn without waiting and without capturing output. Used for the
    /// long-running mirroring window.
    pub fn spawn<S: AsRef<str>>(&self, args: &[S], cwd: Option<&Path>) -> Result<Child, Error> {
        let mut cmd = self.command(args);
        cmd.stdin(Stdio::null());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        debug!(command = %self.command_line(args), "spawning tool");
        cmd.spawn().map_err(|e| self.spawn_error(e))
    }

    /// Human-readable command line, for logs and error messages.
    pub fn command_line<S: AsRef<str>>(&self, args: &[S]) -> String {
        let mut line = self.name.clone();
        for arg in args {
            line.push(' ');
            line.push_str(arg.as_ref());
        }
        line
    }

    fn command<S: AsRef<str>>(&self, args: &[S]) -> Command {
        let mut cmd = Command::new(&self.path);
        cmd.args(args.iter().map(AsRef::as_ref));
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> Error {
        if source.kind() == ErrorKind::NotFound {
            Error::ToolNotFound {
                tool: self.name.clone(),
                path: self.path.clone(),
            }
        } else {
            Error::Io {
                tool: self.name.clone(),
                source,
            }
        }
    }
}

/// Exit code of a finished child, for logging.
pub fn describe_exit(status: ExitStatus) -> String {
    status
        .code()
        .map_or_else(|| "terminated by signal".to_owned(), |c| format!("exit code {c}"))
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-tool");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn captures_stdout_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let tool = Tool::new("fake", script(dir.path(), "echo \"hello $1\""));

        let out = tool.run(&["world"], Duration::from_secs(5)).await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello world");
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported_by_run_checked() {
        let dir = tempfile::tempdir().unwrap();
        let tool = Tool::new("fake", script(dir.path(), "echo boom >&2; exit 3"));

        let out = tool.run(&["x"], Duration::from_secs(5)).await.unwrap();
        assert_eq!(out.status, Some(3));
        assert_eq!(out.combined(), "boom");

        let err = tool.run_checked(&["x"], Duration::from_secs(5)).await.unwrap_err();
        match err {
            Error::ExitStatus { status, output, .. } => {
                assert_eq!(status, Some(3));
                assert_eq!(output, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_tool_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let tool = Tool::new("fake", script(dir.path(), "sleep 5"));

        let err = tool.run(&["devices"], Duration::from_millis(100)).await.unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err:?}");
        assert!(err.to_string().contains("fake devices"));
    }

    #[tokio::test]
    async fn missing_binary_is_tool_not_found() {
        let tool = Tool::new("adb", "/nonexistent/questcast/adb");
        let err = tool.run(&["devices"], Duration::from_secs(1)).await.unwrap_err();
        assert!(err.is_tool_not_found(), "expected ToolNotFound, got {err:?}");
    }

    #[test]
    fn combined_joins_both_streams() {
        let out = ToolOutput {
            status: Some(1),
            stdout: "first\n".into(),
            stderr: "  second \n".into(),
        };
        assert_eq!(out.combined(), "first\nsecond");
    }
}
