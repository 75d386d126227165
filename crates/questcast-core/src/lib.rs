// questcast-core: connection state machine between the device bridge and front ends.

pub mod bridge;
pub mod cast;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod machine;
pub mod model;
pub mod poller;
pub mod status;
pub mod wireless;

#[cfg(test)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::DeviceBridge;
pub use cast::{DetachedSession, cast_target, launch, launch_detached};
pub use command::{Command, CommandResult};
pub use config::ControllerConfig;
pub use controller::{Controller, StatusEvent, probe};
pub use error::CoreError;
pub use machine::Transition;
pub use poller::Poller;
pub use status::{Indicator, StatusView, WirelessAction, install_hint};
pub use wireless::{UpgradeOutcome, request_wireless_disconnect, request_wireless_upgrade};

pub use model::{
    AppConnectionState, ConnectionSnapshot, DeviceIdentity, DeviceState, ObservedDevice,
    PollFault, PollHealth, Transport,
};
