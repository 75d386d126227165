// ── Device status poller ──
//
// Runs the device listing and turns its text into a `ConnectionSnapshot`.
// All knowledge of the listing format lives here; the state machine only
// ever sees typed snapshots.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::bridge::DeviceBridge;
use crate::error::CoreError;
use crate::model::{ConnectionSnapshot, DeviceIdentity, ObservedDevice, PollFault};

/// Result of classifying one line of the device listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Device(ObservedDevice),
    Ignored(IgnoreReason),
}

/// Why a listing line produced no device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    Blank,
    /// `List of devices attached`.
    Header,
    /// `* daemon not running; starting now at tcp:5037` and friends.
    DaemonMessage,
    /// Fewer than two fields.
    Malformed,
    /// A state word other than `device`/`unauthorized` (`offline`,
    /// `recovery`, `no permissions`, ...). Tolerated to survive tool
    /// version drift.
    UnknownState(String),
}

/// Classify one line of `adb devices` (or `adb devices -l`) output.
pub fn parse_line(line: &str) -> ParsedLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ParsedLine::Ignored(IgnoreReason::Blank);
    }
    if trimmed.starts_with('*') {
        return ParsedLine::Ignored(IgnoreReason::DaemonMessage);
    }
    if trimmed.starts_with("List of devices") {
        return ParsedLine::Ignored(IgnoreReason::Header);
    }

    let mut fields = trimmed.split_whitespace();
    let (Some(address), Some(word)) = (fields.next(), fields.next()) else {
        return ParsedLine::Ignored(IgnoreReason::Malformed);
    };

    let identity = DeviceIdentity::from_address(address);
    match word {
        "device" => ParsedLine::Device(ObservedDevice::authorized(identity)),
        "unauthorized" => ParsedLine::Device(ObservedDevice::unauthorized(identity)),
        other => ParsedLine::Ignored(IgnoreReason::UnknownState(other.to_owned())),
    }
}

/// Every device row in a listing, in listing order.
pub fn parse_listing(text: &str) -> Vec<ObservedDevice> {
    text.lines()
        .filter_map(|line| match parse_line(line) {
            ParsedLine::Device(device) => Some(device),
            ParsedLine::Ignored(IgnoreReason::Blank | IgnoreReason::Header) => None,
            ParsedLine::Ignored(reason) => {
                debug!(line, ?reason, "ignoring device listing line");
                None
            }
        })
        .collect()
}

/// Produces snapshots on demand. Holds no state between polls.
#[derive(Debug)]
pub struct Poller<B> {
    bridge: Arc<B>,
}

impl<B> Clone for Poller<B> {
    fn clone(&self) -> Self {
        Self {
            bridge: Arc::clone(&self.bridge),
        }
    }
}

impl<B: DeviceBridge> Poller<B> {
    pub fn new(bridge: Arc<B>) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &Arc<B> {
        &self.bridge
    }

    /// List devices once.
    ///
    /// Only a missing tool is an error. Timeouts, non-zero exits, and I/O
    /// failures come back as an empty snapshot tagged with a [`PollFault`],
    /// which renders the same as "no headset attached".
    pub async fn poll(&self) -> Result<ConnectionSnapshot, CoreError> {
        match self.bridge.list_devices().await {
            Ok(text) => Ok(ConnectionSnapshot::new(parse_listing(&text))),
            Err(questcast_bridge::Error::ToolNotFound { tool, path }) => {
                Err(CoreError::ToolNotFound { tool, path })
            }
            Err(questcast_bridge::Error::Timeout { command, timeout_ms }) => {
                debug!(command, timeout_ms, "device listing timed out");
                Ok(ConnectionSnapshot::faulted(PollFault::Timeout))
            }
            Err(questcast_bridge::Error::ExitStatus { status, output, .. }) => {
                warn!(?status, output, "device listing failed");
                Ok(ConnectionSnapshot::faulted(PollFault::ExitStatus { code: status }))
            }
            Err(err) => {
                warn!(error = %err, "device listing failed");
                Ok(ConnectionSnapshot::faulted(PollFault::Io {
                    message: err.to_string(),
                }))
            }
        }
    }
}
