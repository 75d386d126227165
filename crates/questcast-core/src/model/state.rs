// ── Connection state ──

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use super::identity::DeviceIdentity;

/// What the status indicator is derived from.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceState {
    /// No identity observed.
    #[default]
    Absent,
    /// Identity observed, host not yet approved for debugging.
    Unauthorized,
    /// Authorized over USB.
    Ready,
    /// Authorized over TCP.
    ReadyWireless,
}

impl DeviceState {
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready | Self::ReadyWireless)
    }
}

/// Process-wide connection state. One instance, owned by the scheduler
/// task from startup to shutdown; everyone else sees clones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConnectionState {
    pub state: DeviceState,
    /// The identity `state` was derived from.
    pub identity: Option<DeviceIdentity>,
    /// HostPort identity of a wireless upgrade that has been handshaken
    /// but not yet seen in a poll.
    pub wireless_upgrade_in_flight: Option<DeviceIdentity>,
}

impl AppConnectionState {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn new(state: DeviceState, identity: Option<DeviceIdentity>) -> Self {
        Self {
            state,
            identity,
            wireless_upgrade_in_flight: None,
        }
    }

    pub fn with_in_flight(mut self, pending: Option<DeviceIdentity>) -> Self {
        self.wireless_upgrade_in_flight = pending;
        self
    }

    pub fn upgrade_pending(&self) -> bool {
        self.wireless_upgrade_in_flight.is_some()
    }
}

/// How the last polls went, independent of what they found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "health", rename_all = "snake_case")]
pub enum PollHealth {
    /// Last poll ran the tool and read its output.
    #[default]
    Ok,
    /// The device-bridge tool could not be found.
    ToolMissing { tool: String, path: PathBuf },
    /// The last `consecutive` polls timed out.
    TimingOut { consecutive: u32 },
}

impl PollHealth {
    pub fn is_tool_missing(&self) -> bool {
        matches!(self, Self::ToolMissing { .. })
    }
}
