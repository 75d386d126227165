//! Process plumbing for the two external tools questcast drives.
//!
//! - **[`Tool`]**: a resolved executable with bounded-timeout invocation
//!   ([`Tool::run`]) and detached spawning ([`Tool::spawn`]).
//! - **[`Adb`]**: the device-bridge vocabulary: device listing, Wi-Fi
//!   address lookup, `tcpip`, `connect`, `disconnect`, `usb`.
//! - **[`Mirror`]**: the scrcpy flag template and launcher.
//! - **[`locate`]**: executable resolution across explicit paths, the
//!   system `PATH`, and a bundle directory.
//!
//! Nothing here interprets device state; `questcast-core` owns that.

pub mod adb;
pub mod error;
pub mod locate;
pub mod mirror;
pub mod tool;

pub use adb::{Adb, DEFAULT_WIRELESS_PORT};
pub use error::Error;
pub use locate::{executable_name, locate};
pub use mirror::{Mirror, MirrorOptions, MirrorSession};
pub use tool::{Tool, ToolOutput};
