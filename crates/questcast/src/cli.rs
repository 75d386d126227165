//! Clap derive structures for the `questcast` CLI.
//!
//! Defines the command tree, global flags, and shared value enums. Also
//! compiled by `build.rs` for man page generation, so this file depends on
//! clap and clap_complete only.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// questcast -- mirror a Meta Quest headset over USB or Wi-Fi
#[derive(Debug, Parser)]
#[command(
    name = "questcast",
    version,
    about = "Mirror a Meta Quest headset to this computer over USB or Wi-Fi",
    long_about = "Watches adb for a connected Quest headset, hands a USB connection over\n\
        to Wi-Fi (adb tcpip + connect), and launches scrcpy with a one-eye crop.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "QUESTCAST_CONFIG", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Path to the adb executable (overrides config)
    #[arg(long, env = "QUESTCAST_ADB", value_name = "PATH", global = true)]
    pub adb: Option<PathBuf>,

    /// Path to the scrcpy executable (overrides config)
    #[arg(long, env = "QUESTCAST_SCRCPY", value_name = "PATH", global = true)]
    pub scrcpy: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "QUESTCAST_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the headset connection status
    #[command(alias = "st")]
    Status,

    /// List every device adb reports
    #[command(alias = "ls")]
    Devices,

    /// Poll continuously and print status changes
    Watch(WatchArgs),

    /// Start mirroring the headset
    Cast(CastArgs),

    /// Switch between USB and Wi-Fi connections
    #[command(alias = "wifi")]
    Wireless(WirelessArgs),

    /// Check that adb, scrcpy, and the config are usable
    Doctor,

    /// Manage the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll interval in milliseconds (overrides config)
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Exit after this many events
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Launch mirroring whenever the headset becomes ready
    #[arg(long)]
    pub cast: bool,
}

// ── Cast ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CastArgs {
    /// Device to mirror: a serial or host:port (defaults to the current connection)
    #[arg(long, short = 't', value_name = "DEVICE")]
    pub target: Option<String>,

    /// Return as soon as the window opens instead of waiting for it to close
    #[arg(long, short = 'd')]
    pub detach: bool,

    /// Hand the connection over to Wi-Fi before mirroring
    #[arg(long, short = 'w', conflicts_with = "target")]
    pub wireless: bool,

    /// Print the scrcpy command line and exit
    #[arg(long)]
    pub dry_run: bool,
}

// ── Wireless ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WirelessArgs {
    #[command(subcommand)]
    pub command: WirelessCommand,
}

#[derive(Debug, Subcommand)]
pub enum WirelessCommand {
    /// Hand a USB connection over to Wi-Fi
    Connect {
        /// How long to wait for the headset to appear on Wi-Fi, in milliseconds
        #[arg(long, default_value = "15000", value_name = "MS")]
        wait_ms: u64,
    },

    /// Close the Wi-Fi session and return to USB mode
    Disconnect,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Display the resolved configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
