//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod cast;
pub mod config_cmd;
pub mod doctor;
pub mod status;
pub mod util;
pub mod watch;
pub mod wireless;

use crate::cli::{Command, GlobalOpts};
use crate::config::{Config, Toolset};
use crate::error::CliError;

/// Dispatch a device-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    tools: &Toolset,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle_status(tools, global).await,
        Command::Devices => status::handle_devices(tools, global).await,
        Command::Watch(args) => watch::handle(args, tools, cfg, global).await,
        Command::Cast(args) => cast::handle(args, tools, cfg, global).await,
        Command::Wireless(args) => wireless::handle(args, tools, cfg, global).await,
        Command::Doctor => doctor::handle(tools, cfg, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
