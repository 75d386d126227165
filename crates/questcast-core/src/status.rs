//! Presentation-neutral status derived from the connection state.
//!
//! Front ends render a [`StatusView`]; none of them look at
//! [`DeviceState`] directly.

use serde::Serialize;
use strum::Display;

use crate::model::{AppConnectionState, DeviceState, PollHealth};

/// Status light colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Indicator {
    Green,
    Yellow,
    Red,
}

impl Indicator {
    /// Dot character for plain-text output.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Green => "●",
            Self::Yellow => "◐",
            Self::Red => "○",
        }
    }
}

/// What the wireless control offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WirelessAction {
    Connect { enabled: bool },
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub indicator: Indicator,
    pub headline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub wireless: WirelessAction,
    pub can_cast: bool,
    pub state: DeviceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl StatusView {
    pub fn new(state: &AppConnectionState, health: &PollHealth) -> Self {
        let device = state.identity.as_ref().map(ToString::to_string);

        if let PollHealth::ToolMissing { tool, .. } = health {
            return Self {
                indicator: Indicator::Red,
                headline: format!("{tool} was not found"),
                detail: Some(install_hint().to_owned()),
                wireless: WirelessAction::Connect { enabled: false },
                can_cast: false,
                state: state.state,
                device,
            };
        }

        let (indicator, headline, wireless) = match state.state {
            DeviceState::ReadyWireless => (
                Indicator::Green,
                "Connected wirelessly".to_owned(),
                WirelessAction::Disconnect,
            ),
            DeviceState::Ready => (
                Indicator::Green,
                "Connected over USB".to_owned(),
                WirelessAction::Connect {
                    enabled: !state.upgrade_pending(),
                },
            ),
            DeviceState::Unauthorized => (
                Indicator::Yellow,
                "Approve access on the headset (Always Allow)".to_owned(),
                WirelessAction::Connect { enabled: false },
            ),
            DeviceState::Absent => (
                Indicator::Red,
                "Make sure the headset is on and connected".to_owned(),
                WirelessAction::Connect { enabled: false },
            ),
        };

        let detail = match (health, &state.wireless_upgrade_in_flight) {
            (PollHealth::TimingOut { consecutive }, _) => Some(format!(
                "The device bridge has not answered the last {consecutive} polls"
            )),
            (_, Some(target)) if state.state != DeviceState::ReadyWireless => {
                Some(format!("Waiting for the headset to appear at {target}"))
            }
            _ => None,
        };

        Self {
            indicator,
            headline,
            detail,
            wireless,
            can_cast: state.state.is_ready(),
            state: state.state,
            device,
        }
    }
}

/// Installation steps for the two external tools on the host OS.
pub fn install_hint() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with Homebrew: brew install scrcpy android-platform-tools, \
         then enable developer mode on the headset and connect it over USB."
    } else if cfg!(target_os = "windows") {
        "Place adb.exe and scrcpy.exe in the bundle directory (tools.bundle_dir) \
         and install the Oculus ADB drivers, then enable developer mode on the headset."
    } else {
        "Install with your package manager (apt install scrcpy adb, \
         dnf install scrcpy android-tools, or pacman -S scrcpy android-tools), \
         then enable developer mode on the headset and connect it over USB."
    }
}
