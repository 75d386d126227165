//! CLI configuration: thin wrapper around `questcast_config`.
//!
//! Resolves the config file location and tool paths with `GlobalOpts`
//! flag overrides on top.

use std::path::PathBuf;
use std::sync::Arc;

use questcast_bridge::{Adb, Mirror, Tool, locate};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use questcast_config::{Config, config_path, save_config_to};

/// Config file path: `--config` if given, else the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load and validate the config for this invocation.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(questcast_config::load_config_from(&config_file(global))?)
}

/// Resolved external tools.
pub struct Toolset {
    pub adb: Arc<Adb>,
    pub mirror: Mirror,
}

/// Resolve `adb` and `scrcpy`: CLI flag, then `[tools]`, then `PATH` and
/// the bundle directory.
pub fn toolset(global: &GlobalOpts, cfg: &Config) -> Toolset {
    let bundle = cfg.tools.bundle_dir.as_deref();

    let adb_path = locate(
        "adb",
        global.adb.as_deref().or(cfg.tools.adb.as_deref()),
        bundle,
    );
    let scrcpy_path = locate(
        "scrcpy",
        global.scrcpy.as_deref().or(cfg.tools.scrcpy.as_deref()),
        bundle,
    );
    tracing::debug!(adb = %adb_path.display(), scrcpy = %scrcpy_path.display(), "resolved tools");

    let adb = Adb::new(Tool::new("adb", adb_path), cfg.adb_timeout());

    let mut mirror = Mirror::new(Tool::new("scrcpy", scrcpy_path.clone()));
    // Bundled scrcpy builds load their DLLs and server jar from their own
    // directory.
    if let Some(dir) = bundle {
        if scrcpy_path.starts_with(dir) {
            mirror = mirror.with_working_dir(dir);
        }
    }

    Toolset {
        adb: Arc::new(adb),
        mirror,
    }
}
