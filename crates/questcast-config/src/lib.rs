//! Configuration for questcast.
//!
//! TOML file + `QUESTCAST_*` environment, validation, and translation to
//! `questcast_core::ControllerConfig` and `questcast_bridge::MirrorOptions`.
//! The CLI layers its global flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use questcast_bridge::{DEFAULT_WIRELESS_PORT, MirrorOptions};
use questcast_core::ControllerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Milliseconds between device polls.
    pub refresh_interval_ms: u64,

    /// Upper bound on any single device-bridge invocation.
    pub adb_timeout_ms: u64,

    /// Port used for the wireless upgrade.
    pub wireless_port: u16,

    /// Inclusive port range tried in order. Takes precedence over
    /// `wireless_port`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wireless_port_range: Option<PortRange>,

    /// Consecutive poll timeouts before the user is warned.
    pub timeout_warn_after: u32,

    pub tools: Tools,

    pub mirror: MirrorOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 2000,
            adb_timeout_ms: 4000,
            wireless_port: DEFAULT_WIRELESS_PORT,
            wireless_port_range: None,
            timeout_warn_after: 3,
            tools: Tools::default(),
            mirror: MirrorOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

/// Where to find the external tools. Unset entries are looked up on
/// `PATH` and in `bundle_dir`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Tools {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adb: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrcpy: Option<PathBuf>,
    /// Directory shipping bundled `adb`/`scrcpy` builds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_dir: Option<PathBuf>,
}

const REFRESH_RANGE: (u64, u64) = (500, 10_000);
const ADB_TIMEOUT_RANGE: (u64, u64) = (1000, 30_000);
const MAX_SIZE_RANGE: (u32, u32) = (240, 2160);
const MIN_PORT: u16 = 1000;
const RENDER_DRIVERS: &[&str] = &["opengl", "software", "direct3d"];
const VIDEO_CODECS: &[&str] = &["h264", "h265", "av1"];

impl Config {
    /// Check every field against its allowed range or format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("refresh_interval_ms", self.refresh_interval_ms, REFRESH_RANGE)?;
        check_range("adb_timeout_ms", self.adb_timeout_ms, ADB_TIMEOUT_RANGE)?;

        if self.wireless_port < MIN_PORT {
            return Err(invalid(
                "wireless_port",
                format!("expected a port of {MIN_PORT} or above, got {}", self.wireless_port),
            ));
        }
        if let Some(range) = self.wireless_port_range {
            if range.start < MIN_PORT || range.start > range.end {
                return Err(invalid(
                    "wireless_port_range",
                    format!(
                        "expected {MIN_PORT} <= start <= end, got {}..{}",
                        range.start, range.end
                    ),
                ));
            }
        }

        if self.timeout_warn_after == 0 {
            return Err(invalid("timeout_warn_after", "must be at least 1"));
        }

        validate_mirror(&self.mirror)
    }

    /// Ports the wireless upgrade tries, in order.
    pub fn candidate_ports(&self) -> Vec<u16> {
        match self.wireless_port_range {
            Some(range) => (range.start..=range.end).collect(),
            None => vec![self.wireless_port],
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn adb_timeout(&self) -> Duration {
        Duration::from_millis(self.adb_timeout_ms)
    }

    /// Scheduler settings for `questcast_core::Controller`.
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            refresh_interval: self.refresh_interval(),
            wireless_ports: self.candidate_ports(),
            timeout_warn_after: self.timeout_warn_after,
        }
    }
}

fn check_range<T>(field: &str, value: T, (min, max): (T, T)) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(invalid(
            field,
            format!("expected {min} to {max}, got {value}"),
        ));
    }
    Ok(())
}

fn validate_mirror(mirror: &MirrorOptions) -> Result<(), ConfigError> {
    if !RENDER_DRIVERS.contains(&mirror.render_driver.as_str()) {
        return Err(invalid(
            "mirror.render_driver",
            format!(
                "expected one of {}, got '{}'",
                RENDER_DRIVERS.join(", "),
                mirror.render_driver
            ),
        ));
    }

    if let Some(ref crop) = mirror.crop {
        if !is_crop(crop) {
            return Err(invalid(
                "mirror.crop",
                format!("expected width:height:x:y, got '{crop}'"),
            ));
        }
    }

    if !is_bitrate(&mirror.bitrate) {
        return Err(invalid(
            "mirror.bitrate",
            format!("expected digits with an optional K or M suffix, got '{}'", mirror.bitrate),
        ));
    }

    check_range("mirror.max_size", mirror.max_size, MAX_SIZE_RANGE)?;

    if !VIDEO_CODECS.contains(&mirror.video_codec.as_str()) {
        return Err(invalid(
            "mirror.video_codec",
            format!(
                "expected one of {}, got '{}'",
                VIDEO_CODECS.join(", "),
                mirror.video_codec
            ),
        ));
    }

    Ok(())
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_crop(s: &str) -> bool {
    let parts: Vec<&str> = s.split(':').collect();
    parts.len() == 4 && parts.iter().all(|p| is_digits(p))
}

fn is_bitrate(s: &str) -> bool {
    let digits = s.strip_suffix(['K', 'M']).unwrap_or(s);
    is_digits(digits)
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("il.co", "loginvr", "questcast").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("questcast");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from `path` + environment, then validate. A missing file is not
/// an error; defaults apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("QUESTCAST_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Validate, then write `cfg` as TOML to `path`, creating parent dirs.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    cfg.validate()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.candidate_ports(), vec![5555]);
        assert_eq!(cfg.controller_config(), ControllerConfig::default());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.refresh_interval_ms, 2000);
        assert_eq!(cfg.mirror, MirrorOptions::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
refresh_interval_ms = 1000
wireless_port_range = { start = 5555, end = 5557 }

[tools]
adb = "/opt/platform-tools/adb"

[mirror]
bitrate = "8M"
crop = "1832:1920:0:0"
no_audio = false
"#,
        );
        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.refresh_interval(), Duration::from_millis(1000));
        assert_eq!(cfg.candidate_ports(), vec![5555, 5556, 5557]);
        assert_eq!(cfg.tools.adb, Some(PathBuf::from("/opt/platform-tools/adb")));
        assert_eq!(cfg.mirror.bitrate, "8M");
        assert!(!cfg.mirror.no_audio);
        // Untouched keys keep their defaults.
        assert_eq!(cfg.mirror.render_driver, "opengl");
        assert_eq!(cfg.adb_timeout_ms, 4000);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for (body, field) in [
            ("refresh_interval_ms = 100", "refresh_interval_ms"),
            ("adb_timeout_ms = 60000", "adb_timeout_ms"),
            ("wireless_port = 80", "wireless_port"),
            ("wireless_port_range = { start = 5560, end = 5555 }", "wireless_port_range"),
            ("[mirror]\nmax_size = 4096", "mirror.max_size"),
            ("[mirror]\nrender_driver = \"vulkan\"", "mirror.render_driver"),
            ("[mirror]\nvideo_codec = \"vp9\"", "mirror.video_codec"),
            ("[mirror]\nbitrate = \"4G\"", "mirror.bitrate"),
            ("[mirror]\ncrop = \"1600:900:2017\"", "mirror.crop"),
        ] {
            let err = load_config_from(&write(&dir, body)).unwrap_err();
            match err {
                ConfigError::Validation { field: got, .. } => assert_eq!(got, field, "{body}"),
                other => panic!("{body}: unexpected error {other}"),
            }
        }
    }

    #[test]
    fn bitrate_and_crop_formats() {
        assert!(is_bitrate("4M"));
        assert!(is_bitrate("800K"));
        assert!(is_bitrate("8000000"));
        assert!(!is_bitrate("M"));
        assert!(!is_bitrate("4MB"));
        assert!(is_crop("1600:900:2017:510"));
        assert!(!is_crop("1600:900:x:510"));
        assert!(!is_crop("1600::2017:510"));
    }

    #[test]
    fn malformed_toml_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_from(&write(&dir, "refresh_interval_ms = \"soon\"")).unwrap_err();
        assert!(matches!(err, ConfigError::Figment(_)));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            wireless_port: 5556,
            tools: Tools {
                bundle_dir: Some(PathBuf::from("/opt/questcast/tools")),
                ..Tools::default()
            },
            ..Config::default()
        };
        save_config_to(&cfg, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), cfg);
    }
}
