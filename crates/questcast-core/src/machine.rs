// ── Connection state machine ──
//
// `next` folds one snapshot into the previous state. It is total and pure:
// no I/O, no clock, no history beyond the previous state record (the
// pending wireless upgrade is carried in that record explicitly).

use serde::Serialize;

use crate::model::{AppConnectionState, ConnectionSnapshot, DeviceIdentity, DeviceState, Transport};

/// Compute the state that follows `current` after observing `snapshot`.
///
/// Rules, first match wins:
///
/// 1. No devices: `Absent`, identity and pending upgrade cleared.
/// 2. Any unauthorized device: `Unauthorized` on the smallest address.
/// 3. The pending upgrade's TCP identity is listed authorized:
///    `ReadyWireless` on it, pending upgrade cleared. A confirmed session
///    (`current` is `ReadyWireless` and its identity is still listed)
///    stays `ReadyWireless`.
/// 4. Any authorized USB device: `Ready` on the smallest serial.
/// 5. Authorized TCP devices only: `ReadyWireless` on the smallest address.
///
/// Rule 3 runs before rule 4, so a cable left plugged in does not mask a
/// wireless session that was requested or confirmed.
pub fn next(current: &AppConnectionState, snapshot: &ConnectionSnapshot) -> AppConnectionState {
    // 1
    if snapshot.is_empty() {
        return AppConnectionState::absent();
    }

    let pending = current.wireless_upgrade_in_flight.clone();

    // 2
    if let Some(identity) = snapshot.first_unauthorized() {
        return AppConnectionState::new(DeviceState::Unauthorized, Some(identity.clone()))
            .with_in_flight(pending);
    }

    // 3
    if let Some(ref target) = pending {
        if target.is_tcp() && snapshot.contains_authorized(target) {
            return AppConnectionState::new(DeviceState::ReadyWireless, Some(target.clone()));
        }
    }
    if current.state == DeviceState::ReadyWireless {
        if let Some(ref session) = current.identity {
            if snapshot.contains_authorized(session) {
                return AppConnectionState::new(DeviceState::ReadyWireless, Some(session.clone()))
                    .with_in_flight(pending);
            }
        }
    }

    // 4
    if let Some(usb) = snapshot.first_authorized(Transport::Usb) {
        return AppConnectionState::new(DeviceState::Ready, Some(usb.clone()))
            .with_in_flight(pending);
    }

    // 5
    match snapshot.first_authorized(Transport::Tcp) {
        Some(tcp) => AppConnectionState::new(DeviceState::ReadyWireless, Some(tcp.clone()))
            .with_in_flight(pending),
        None => AppConnectionState::absent(),
    }
}

/// A visible change between two states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: DeviceState,
    pub to: DeviceState,
    pub identity: Option<DeviceIdentity>,
}

/// Report a change of device state or identity. Changes to the pending
/// upgrade alone are not transitions.
pub fn describe(prev: &AppConnectionState, next: &AppConnectionState) -> Option<Transition> {
    if prev.state == next.state && prev.identity == next.identity {
        return None;
    }
    Some(Transition {
        from: prev.state,
        to: next.state,
        identity: next.identity.clone(),
    })
}
