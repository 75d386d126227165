// ── scrcpy launcher ──
//
// Builds the fixed flag template and spawns the mirroring window. The
// exit status is only ever logged: scrcpy commonly exits non-zero when
// the user closes the window.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Child;
use tracing::info;

use crate::error::Error;
use crate::tool::{Tool, describe_exit};

/// Flags passed to every mirroring session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct MirrorOptions {
    pub render_driver: String,
    /// Crop region `width:height:x:y`. The default shows one eye of a Quest.
    pub crop: Option<String>,
    pub bitrate: String,
    pub max_size: u32,
    pub video_codec: String,
    pub video_encoder: Option<String>,
    pub no_audio: bool,
    pub no_control: bool,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            render_driver: "opengl".into(),
            crop: Some("1600:900:2017:510".into()),
            bitrate: "4M".into(),
            max_size: 1024,
            video_codec: "h264".into(),
            video_encoder: Some("OMX.qcom.video.encoder.avc".into()),
            no_audio: true,
            no_control: true,
        }
    }
}

impl MirrorOptions {
    /// Full argument list, with `-s <serial>` first when a target is given.
    pub fn to_args(&self, serial: Option<&str>) -> Vec<String> {
        let mut args = Vec::with_capacity(16);
        if let Some(serial) = serial {
            args.push("-s".to_owned());
            args.push(serial.to_owned());
        }
        args.push("--render-driver".to_owned());
        args.push(self.render_driver.clone());
        if let Some(ref crop) = self.crop {
            args.push("--crop".to_owned());
            args.push(crop.clone());
        }
        args.push("-b".to_owned());
        args.push(self.bitrate.clone());
        args.push("--max-size".to_owned());
        args.push(self.max_size.to_string());
        args.push("--video-codec".to_owned());
        args.push(self.video_codec.clone());
        if let Some(ref encoder) = self.video_encoder {
            args.push("--video-encoder".to_owned());
            args.push(encoder.clone());
        }
        if self.no_audio {
            args.push("--no-audio".to_owned());
        }
        if self.no_control {
            args.push("-n".to_owned());
        }
        args
    }
}

/// Handle to the scrcpy executable.
#[derive(Debug, Clone)]
pub struct Mirror {
    tool: Tool,
    working_dir: Option<PathBuf>,
}

impl Mirror {
    pub fn new(tool: Tool) -> Self {
        Self {
            tool,
            working_dir: None,
        }
    }

    /// Run scrcpy from `dir`. Bundled Windows builds need their DLLs
    /// next to the working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn tool(&self) -> &Tool {
        &self.tool
    }

    pub fn command_line(&self, options: &MirrorOptions, serial: Option<&str>) -> String {
        self.tool.command_line(&options.to_args(serial))
    }

    /// Spawn the mirroring window and return immediately.
    pub fn launch(&self, options: &MirrorOptions, serial: Option<&str>) -> Result<MirrorSession, Error> {
        let args = options.to_args(serial);
        let child = self.tool.spawn(&args, self.working_dir.as_deref())?;
        info!(pid = ?child.id(), target = serial.unwrap_or("<default>"), "mirroring started");
        Ok(MirrorSession { child })
    }

    /// First line of `scrcpy --version`.
    pub async fn version(&self, timeout: Duration) -> Result<String, Error> {
        let output = self.tool.run_checked(&["--version"], timeout).await?;
        Ok(output.stdout.lines().next().unwrap_or_default().trim().to_owned())
    }
}

/// A running mirroring window.
#[derive(Debug)]
pub struct MirrorSession {
    child: Child,
}

impl MirrorSession {
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the window to close and log how it exited. Returns the
    /// exit code when there is one.
    pub async fn wait(mut self) -> Result<Option<i32>, Error> {
        let status = self.child.wait().await.map_err(|source| Error::Io {
            tool: "scrcpy".into(),
            source,
        })?;
        info!(status = %describe_exit(status), "mirroring ended");
        Ok(status.code())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_template_matches_quest_profile() {
        let args = MirrorOptions::default().to_args(Some("192.168.1.10:5555"));
        assert_eq!(
            args,
            [
                "-s",
                "192.168.1.10:5555",
                "--render-driver",
                "opengl",
                "--crop",
                "1600:900:2017:510",
                "-b",
                "4M",
                "--max-size",
                "1024",
                "--video-codec",
                "h264",
                "--video-encoder",
                "OMX.qcom.video.encoder.avc",
                "--no-audio",
                "-n",
            ]
        );
    }

    #[test]
    fn optional_flags_are_omitted() {
        let options = MirrorOptions {
            crop: None,
            video_encoder: None,
            no_audio: false,
            no_control: false,
            ..MirrorOptions::default()
        };
        let args = options.to_args(None);
        assert!(!args.iter().any(|a| a == "-s"));
        assert!(!args.iter().any(|a| a == "--crop"));
        assert!(!args.iter().any(|a| a == "--video-encoder"));
        assert!(!args.iter().any(|a| a == "--no-audio"));
        assert!(!args.iter().any(|a| a == "-n"));
        assert_eq!(args.first().map(String::as_str), Some("--render-driver"));
    }

    #[test]
    fn command_line_is_printable() {
        let mirror = Mirror::new(Tool::new("scrcpy", "/usr/bin/scrcpy"));
        let line = mirror.command_line(&MirrorOptions::default(), Some("1WMHH000000000"));
        assert!(line.starts_with("scrcpy -s 1WMHH000000000 --render-driver opengl"));
        assert!(line.ends_with("--no-audio -n"));
    }
}
