// ── Poll snapshots ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::{DeviceIdentity, Transport};

/// One row of the device listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedDevice {
    pub identity: DeviceIdentity,
    pub authorized: bool,
}

impl ObservedDevice {
    pub fn authorized(identity: DeviceIdentity) -> Self {
        Self {
            identity,
            authorized: true,
        }
    }

    pub fn unauthorized(identity: DeviceIdentity) -> Self {
        Self {
            identity,
            authorized: false,
        }
    }
}

/// Why a snapshot came back empty even though the tool was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PollFault {
    Timeout,
    ExitStatus { code: Option<i32> },
    Io { message: String },
}

/// The poller's output for one cycle. Replaced every cycle, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    pub devices: Vec<ObservedDevice>,
    pub taken_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<PollFault>,
}

impl ConnectionSnapshot {
    pub fn new(devices: Vec<ObservedDevice>) -> Self {
        Self {
            devices,
            taken_at: Utc::now(),
            fault: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Empty snapshot standing in for a failed listing.
    pub fn faulted(fault: PollFault) -> Self {
        Self {
            fault: Some(fault),
            ..Self::empty()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn contains_authorized(&self, identity: &DeviceIdentity) -> bool {
        self.devices
            .iter()
            .any(|d| d.authorized && d.identity == *identity)
    }

    /// Unauthorized device with the smallest address string.
    pub fn first_unauthorized(&self) -> Option<&DeviceIdentity> {
        first_by_address(self.devices.iter().filter(|d| !d.authorized))
    }

    /// Authorized device on `transport` with the smallest address string.
    pub fn first_authorized(&self, transport: Transport) -> Option<&DeviceIdentity> {
        first_by_address(
            self.devices
                .iter()
                .filter(|d| d.authorized && d.identity.transport() == transport),
        )
    }
}

fn first_by_address<'a>(
    devices: impl Iterator<Item = &'a ObservedDevice>,
) -> Option<&'a DeviceIdentity> {
    devices
        .map(|d| &d.identity)
        .min_by_key(|identity| identity.address())
}
