// ── Command API ──
//
// Everything that mutates connection state from outside the poll loop
// goes through `Command`. The scheduler task runs commands between
// ticks, so no lock guards the state.

use tokio::sync::oneshot;

use crate::error::CoreError;
use crate::model::AppConnectionState;
use crate::wireless::UpgradeOutcome;

/// A command sent through the command channel, with its reply slot.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: oneshot::Sender<Result<CommandResult, CoreError>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Poll now instead of waiting for the next tick.
    Refresh,
    /// Hand the USB-attached headset over to a wireless session.
    UpgradeWireless,
    /// Close the wireless session and return to USB mode.
    DisconnectWireless,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// State after the command ran.
    State(AppConnectionState),
    Upgrade(UpgradeOutcome),
}
